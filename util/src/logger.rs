//! Logging setup
//!
//! Records go to two places: the terminal, filtered at the level the
//! executable asks for, and the session log file, which always keeps debug
//! records so a run can be picked apart afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Level at which the session log file is written.
const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Targets which would flood the log at debug level, and the level they are
/// capped at instead.
const NOISY_TARGETS: [(&str, LevelFilter); 2] = [
    ("drive_lib::kinematics", LevelFilter::Info),
    ("drive_lib::module_if", LevelFilter::Info),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Terminal log level must be at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `term_level` filters the terminal output and must not be more verbose than
/// `LevelFilter::Info`. The session log file is written at debug level
/// regardless.
///
/// Can only succeed once per process.
pub fn logger_init(term_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if term_level > LevelFilter::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(term_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let term = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record, message, true)))
        })
        .level(term_level)
        .chain(std::io::stdout());

    let mut file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record, message, false)))
        })
        .level(FILE_LEVEL);
    for (target, level) in NOISY_TARGETS.iter() {
        file = file.level_for(*target, *level);
    }

    fern::Dispatch::new()
        .chain(term)
        .chain(file.chain(log_file))
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Terminal level: {:?}, file level: {:?}", term_level, FILE_LEVEL);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a record as `[elapsed LVL] target: message`. The target is only
/// shown for debug and trace records.
fn format_record(record: &Record, message: &std::fmt::Arguments, colour: bool) -> String {
    let tag = if colour {
        level_tag(record.level()).to_string()
    }
    else {
        level_tag(record.level()).clear().to_string()
    };

    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            record.target(),
            message
        )
    }
    else {
        format!("[{:10.6} {}] {}", session::get_elapsed_seconds(), tag, message)
    }
}

/// Short tag for a log level.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn).clear().to_string(), "WRN");
        assert_eq!(level_tag(Level::Trace).clear().to_string(), "TRC");
    }
}

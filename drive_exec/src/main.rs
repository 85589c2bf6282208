//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable drives a simulated chassis to a target pose:
//!
//!     - Initialise the session, logging and the drivetrain
//!     - Main loop:
//!         - Module and heading sensing
//!         - Drivetrain processing
//!         - Module setpoint execution
//!         - Archiving
//!     - Report the final state as JSON, on stdout and in the session directory

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use drive_lib::{
    drivetrain::{
        DriveCmd, Drivetrain, DrivetrainError, InputData, OutputData, Params, StatusReport,
    },
    geom::Pose,
    module_if::{HeadingSensor, SimChassis},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::{MakeSafe, State},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the drivetrain parameter file inside the parameters directory.
const PARAMS_FILE: &str = "drivetrain.toml";

/// Number of consecutive overruns after which the timing is flagged as broken.
const MAX_CONSEC_OVERRUNS: u64 = 50;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive a simulated swerve chassis to a target pose.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec")]
struct Opts {
    /// Drivetrain parameter file. If not given `drivetrain.toml` is loaded from
    /// `$SWERVE_SW_ROOT/params`.
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Directory to create the session in. If not given `sessions` in
    /// `$SWERVE_SW_ROOT` is used.
    #[structopt(long, parse(from_os_str))]
    sessions_dir: Option<PathBuf>,

    /// Target X position in meters
    #[structopt(long, allow_hyphen_values = true)]
    target_x_m: f64,

    /// Target Y position in meters
    #[structopt(long, allow_hyphen_values = true)]
    target_y_m: f64,

    /// Target heading in degrees
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    target_heading_deg: f64,

    /// Approach speed in meters/second
    #[structopt(long, default_value = "1.0")]
    speed_ms: f64,

    /// Give up after this many seconds of simulated time
    #[structopt(long, default_value = "20.0")]
    duration_s: f64,

    /// Run as fast as possible rather than in real time
    #[structopt(long)]
    fast: bool,
}

/// Summary printed at the end of the run.
#[derive(Serialize)]
struct RunSummary {
    arrived: bool,
    num_cycles: u64,
    sim_time_s: f64,
    estimated_pose: Pose,
    true_pose: Pose,
    output: OutputData,
    status: StatusReport,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = match opts.sessions_dir {
        Some(ref dir) => Session::new_in("drive_exec", dir),
        None => Session::new("drive_exec", "sessions"),
    }
    .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Swerve Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params: Params = match opts.params {
        Some(ref path) => util::params::load_from(path),
        None => util::params::load(PARAMS_FILE),
    }
    .wrap_err("Could not load drivetrain params")?;

    if !(opts.duration_s > 0.0) {
        return Err(eyre!("Duration must be positive, found {}", opts.duration_s));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let period_s = params.period_s;
    let max_speed_ms = params.max_speed_ms;
    let gyro_inverted = params.gyro_inverted;
    let initial_pose = params.initial_pose();

    let mut drivetrain = Drivetrain::default();
    drivetrain.init(params, &session)
        .wrap_err("Failed to initialise the Drivetrain")?;
    info!("Drivetrain init complete");

    let kinematics = drivetrain
        .kinematics()
        .ok_or_else(|| eyre!("Drivetrain has no kinematics after init"))?
        .clone();
    let mut chassis = SimChassis::new(kinematics, max_speed_ms, initial_pose, gyro_inverted);

    let target = Pose::new(opts.target_x_m, opts.target_y_m, opts.target_heading_deg.to_radians());
    info!("Driving to {:?} at {:.2} m/s", target, opts.speed_ms);

    let mut cmd = Some(DriveCmd::DriveToPose {
        target,
        target_speed_ms: opts.speed_ms,
        target_heading_rad: target.heading_rad(),
    });

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let max_cycles = (opts.duration_s / period_s).ceil() as u64;
    let mut num_cycles = 0u64;
    let mut num_consec_overruns = 0u64;
    let mut arrived = false;
    let mut last = None;

    while num_cycles < max_cycles {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let (output, status) = run_cycle(&mut drivetrain, &mut chassis, cmd.take(), period_s)
            .wrap_err("Error during Drivetrain processing")?;

        num_cycles += 1;

        let at_target = status.at_target;
        last = Some((output, status));

        if at_target {
            info!("Target reached after {} cycles", num_cycles);
            arrived = true;
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        if opts.fast {
            continue;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(period_s).checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - period_s
                );
                num_consec_overruns += 1;

                if num_consec_overruns == MAX_CONSEC_OVERRUNS {
                    warn!("{} consecutive cycle overruns", MAX_CONSEC_OVERRUNS);
                }
            }
        }
    }

    if !arrived {
        warn!("Target not reached within {:.2} s", opts.duration_s);
        drivetrain.make_safe();

        // One more cycle to get the stop out to the modules
        last = Some(
            run_cycle(&mut drivetrain, &mut chassis, None, period_s)
                .wrap_err("Error stopping the Drivetrain")?
        );
        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    let (output, status) = last.ok_or_else(|| eyre!("No cycles were run"))?;

    let summary = RunSummary {
        arrived,
        num_cycles,
        sim_time_s: num_cycles as f64 * period_s,
        estimated_pose: output.pose,
        true_pose: chassis.true_pose(),
        output,
        status,
    };

    let summary_str = serde_json::to_string_pretty(&summary)
        .wrap_err("Could not serialise the run summary")?;

    let summary_path = session.session_root.join("summary.json");
    std::fs::write(&summary_path, &summary_str)
        .wrap_err_with(|| format!("Could not write the run summary to {:?}", summary_path))?;

    println!("{}", summary_str);

    info!("End of execution");

    Ok(())
}

/// Run one control cycle against the simulated chassis: sense, process,
/// execute the setpoints, then write the archives.
fn run_cycle(
    drivetrain: &mut Drivetrain,
    chassis: &mut SimChassis,
    cmd: Option<DriveCmd>,
    period_s: f64,
) -> Result<(OutputData, StatusReport), DrivetrainError> {

    // ---- DATA INPUT ----

    let input = InputData {
        heading_rad: chassis.gyro().heading_rad(),
        module_states: chassis.feedback(),
        cmd,
    };

    // ---- CONTROL ALGORITHM PROCESSING ----

    let (output, status) = drivetrain.proc(&input)?;

    // ---- MODULE EXECUTION ----

    chassis.command(&output.setpoints, output.open_loop);
    chassis.step(period_s);

    // ---- WRITE ARCHIVES ----

    if let Err(e) = drivetrain.write() {
        warn!("Could not write Drivetrain archives: {}", e);
    }

    Ok((output, status))
}

//! # Drivetrain module
//!
//! The drivetrain is the single owner of the drive state. Once per control
//! cycle it takes the heading reading, module feedback and an optional new
//! command, and produces module setpoints and an updated pose estimate.
//!
//! Within a cycle commands are evaluated against the pose estimated on the
//! previous cycle, after which odometry is advanced with this cycle's
//! feedback. Nothing else writes the pose estimate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod slew;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use params::Params;
pub use slew::SlewRateLimiter;
pub use state::*;

use crate::kinematics::KinematicsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during Drivetrain operation.
#[derive(Debug, thiserror::Error)]
pub enum DrivetrainError {
    #[error("The drivetrain has not been initialised")]
    NotInitialised,

    #[error("Invalid drivetrain parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid module geometry: {0}")]
    Kinematics(#[from] KinematicsError),

    #[error("Could not create the drivetrain archives: {0}")]
    ArchiveInitError(String),
}

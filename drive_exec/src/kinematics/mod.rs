//! # Swerve kinematics module
//!
//! Maps between a single chassis twist and the speed/angle state of each
//! swerve module, and limits sets of module states to what the drive motors
//! can achieve.
//!
//! Module offsets are given in the body frame relative to the centre of
//! rotation. Module order is fixed at construction and every sequence of
//! module states passed in or out of this module uses that same order.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod desaturate;
mod module_state;
mod swerve;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use desaturate::*;
pub use module_state::*;
pub use swerve::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of modules needed for the kinematics to be defined.
pub const MIN_NUM_MODULES: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the module geometry given to the kinematics.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("At least {} modules are required, found {0}", MIN_NUM_MODULES)]
    TooFewModules(usize),

    #[error("The module positions are collinear and cannot define a planar drive")]
    CollinearModules,

    #[error("Cannot invert the module geometry: {0}")]
    SingularGeometry(&'static str),
}

//! Pose control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for pose control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Translation controller proportional gain
    ///
    /// Units: 1/seconds
    pub lin_k_p: f64,

    /// Heading controller proportional gain
    ///
    /// Units: 1/seconds
    pub head_k_p: f64,

    /// Maximum turn rate demand (magnitude)
    ///
    /// Units: radians/second
    pub max_turn_rate_rads: f64,

    /// Distance to the target under which the robot is considered to be at
    /// the target position.
    ///
    /// Units: meters
    pub lin_tolerance_m: f64,

    /// Heading error magnitude under which the robot is considered to be at
    /// the target heading.
    ///
    /// Units: radians
    pub head_tolerance_rad: f64
}

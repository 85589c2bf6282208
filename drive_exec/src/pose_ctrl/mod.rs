//! # Pose control module
//!
//! Pose control drives the robot towards a target pose ("drive to
//! position"). It does this using a pair of proportional laws, one on the
//! translation error and one on the heading error.
//!
//! The translation error is the vector from the robot to the target,
//! expressed in the robot's own frame, so that it splits into an along-track
//! (forward) and a lateral (left) component. Each maps directly onto the
//! matching linear velocity demand, and the resulting vector is limited to
//! the demanded approach speed without changing its direction. Since the
//! linear demand is proportional to the error it shrinks to nothing as the
//! robot arrives, so the robot settles onto the target rather than
//! oscillating about it.
//!
//! The heading error is the shortest signed angle from the current heading to
//! the target heading, and drives the turn rate demand.
//!
//! The controller holds no state between cycles. Deciding when the robot has
//! arrived is left to the caller, see `PoseError::is_within`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controller;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controller::*;
pub use params::Params;

//! Commands passed into the Drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    geom::{Pose, Twist},
    kinematics::ModuleState,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the drivetrain.
///
/// Motion commands (`Twist`, `DriveToPose`, `ModuleStates`, `Stop`) stay in
/// force until another motion command replaces them. `ResetPose` and
/// `ZeroHeading` act once and leave the current motion command running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DriveCmd {
    /// Drive at an operator demanded velocity. The linear and turn rate
    /// demands are slew rate limited.
    Twist {
        twist: Twist,

        /// If set the linear part of `twist` is along the field axes,
        /// otherwise along the robot axes.
        field_relative: bool,

        /// Drive the modules with normalised output rather than closed loop
        /// velocity control.
        open_loop: bool,
    },

    /// Drive towards a target pose using the pose controller.
    DriveToPose {
        target: Pose,

        /// Units: meters/second
        target_speed_ms: f64,

        /// Units: radians
        target_heading_rad: f64,
    },

    /// Drive each module to the given state, in module order.
    ModuleStates(Vec<ModuleState>),

    /// Stop all modules, holding their steer angles.
    Stop,

    /// Re-zero the pose estimate to the position of the given pose. The
    /// heading of the pose is ignored: the estimate keeps the current heading
    /// reading. Use `ZeroHeading` to change the heading.
    ResetPose(Pose),

    /// Take the current heading reading as the new zero heading.
    ZeroHeading,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCmd {
    /// True for commands which set what the modules do until replaced.
    pub fn is_motion(&self) -> bool {
        !matches!(self, DriveCmd::ResetPose(_) | DriveCmd::ZeroHeading)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_motion() {
        assert!(DriveCmd::Stop.is_motion());
        assert!(DriveCmd::ModuleStates(vec![]).is_motion());
        assert!(!DriveCmd::ZeroHeading.is_motion());
        assert!(!DriveCmd::ResetPose(Pose::origin()).is_motion());
    }
}

//! # Odometry module
//!
//! Dead reckoning of the robot pose from module feedback and the heading
//! sensor.
//!
//! Each cycle the measured module states are turned into a body twist by the
//! forward kinematics, which is integrated over one cycle period and composed
//! onto the previous pose. The heading of the result is then replaced by the
//! heading sensor reading: wheel-integrated heading drifts, the sensor
//! doesn't.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};

// Internal
use crate::{
    geom::Pose,
    kinematics::{ModuleState, SwerveKinematics},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose estimator for a swerve drive.
///
/// Owned by the drivetrain, which is the only thing allowed to call `update`
/// or `reset_pose`.
#[derive(Debug, Clone)]
pub struct Odometry {
    kinematics: SwerveKinematics,

    /// Duration of one control cycle.
    ///
    /// Units: seconds
    period_s: f64,

    /// The current pose estimate
    pose: Pose,

    /// Heading sensor reading at the last update or reset
    ///
    /// Units: radians
    last_heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Start tracking from `initial_pose`.
    ///
    /// `initial_heading_rad` is the heading sensor reading at the time the
    /// robot was at `initial_pose`.
    pub fn new(
        kinematics: SwerveKinematics,
        initial_pose: Pose,
        initial_heading_rad: f64,
        period_s: f64,
    ) -> Self {
        Self {
            kinematics,
            period_s,
            pose: initial_pose.with_heading(initial_heading_rad),
            last_heading_rad: initial_heading_rad,
        }
    }

    /// Advance the estimate by one cycle.
    ///
    /// # Panics
    /// - If `states` doesn't have one entry per module in the kinematics.
    pub fn update(&mut self, heading_rad: f64, states: &[ModuleState]) -> Pose {
        let twist = self.kinematics.to_twist(states);

        // Integrate along the arc described by the wheel twist, then trust
        // the sensor for heading.
        let integrated = self.pose.exp(&twist.scaled(self.period_s));

        trace!(
            "Odometry: twist {:?}, integrated heading {:.4} rad, sensor heading {:.4} rad",
            twist,
            integrated.heading_rad(),
            heading_rad
        );

        self.pose = integrated.with_heading(heading_rad);
        self.last_heading_rad = heading_rad;

        self.pose
    }

    /// Discard the integration history and restart tracking from the
    /// position of `pose`.
    ///
    /// The heading of `pose` is dropped. The stored heading is `heading_rad`,
    /// the sensor reading at the time of the reset, since the sensor is the
    /// only authority on heading. Use a heading zero on the drivetrain to
    /// change what the sensor reads.
    pub fn reset_pose(&mut self, pose: Pose, heading_rad: f64) {
        info!(
            "Odometry reset to ({:.3}, {:.3}) m, heading {:.2} deg",
            pose.x_m(),
            pose.y_m(),
            heading_rad.to_degrees()
        );

        self.pose = pose.with_heading(heading_rad);
        self.last_heading_rad = heading_rad;
    }

    /// The current pose estimate.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn last_heading_rad(&self) -> f64 {
        self.last_heading_rad
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }
}

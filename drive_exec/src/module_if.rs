//! # Hardware capability interfaces
//!
//! The drive core never talks to a particular vendor's devices. Anything that
//! can report a calibrated module state and accept a setpoint is a swerve
//! module, and anything that reports a heading is a heading sensor.
//!
//! Ideal simulated implementations are provided for running the executable
//! without hardware.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use crate::{
    geom::Pose,
    kinematics::{ModuleState, SwerveKinematics},
};
use util::maths::{clamp, lin_map};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single swerve module.
pub trait SwerveModule {
    /// The measured state of the module (speed and steer angle).
    fn state(&self) -> ModuleState;

    /// Command the module to the given state.
    ///
    /// If `open_loop` is set the drive motor is driven by a normalised
    /// output derived from the demanded speed rather than by closed loop
    /// velocity control.
    fn set_desired_state(&mut self, state: ModuleState, open_loop: bool);
}

/// A heading sensor (gyro, IMU).
pub trait HeadingSensor {
    /// The raw heading reading, not corrected for mounting orientation.
    ///
    /// Units: radians
    fn heading_rad(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ideal module which instantly reaches whatever it is commanded.
#[derive(Debug, Clone)]
pub struct SimModule {
    state: ModuleState,

    /// Speed corresponding to full normalised output.
    ///
    /// Units: meters/second
    max_speed_ms: f64,

    /// Normalised drive output from the last open loop command, between -1
    /// and +1.
    drv_output_norm: f64,
}

/// An ideal heading sensor.
#[derive(Debug, Clone, Default)]
pub struct SimHeadingSensor {
    /// Units: radians
    heading_rad: f64,

    /// Set if the sensor is mounted upside down, inverting the reading.
    inverted: bool,
}

/// A simulated chassis: a set of ideal modules, a heading sensor and the true
/// pose of the robot they move.
pub struct SimChassis {
    kinematics: SwerveKinematics,
    modules: Vec<SimModule>,
    gyro: SimHeadingSensor,
    true_pose: Pose,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimModule {
    pub fn new(max_speed_ms: f64) -> Self {
        Self {
            state: ModuleState::default(),
            max_speed_ms,
            drv_output_norm: 0.0,
        }
    }

    pub fn drv_output_norm(&self) -> f64 {
        self.drv_output_norm
    }
}

impl SwerveModule for SimModule {
    fn state(&self) -> ModuleState {
        self.state
    }

    fn set_desired_state(&mut self, state: ModuleState, open_loop: bool) {
        if open_loop {
            // Normalised output saturates at full speed
            self.drv_output_norm = clamp(
                &lin_map(
                    (-self.max_speed_ms, self.max_speed_ms),
                    (-1.0, 1.0),
                    state.speed_ms,
                ),
                &-1.0,
                &1.0,
            );
            self.state = ModuleState::new(
                self.drv_output_norm * self.max_speed_ms,
                state.angle_rad,
            );
        }
        else {
            self.drv_output_norm = 0.0;
            self.state = state;
        }
    }
}

impl SimHeadingSensor {
    pub fn new(heading_rad: f64, inverted: bool) -> Self {
        Self {
            heading_rad,
            inverted,
        }
    }

    /// Set the true heading of the robot.
    pub fn set_true_heading(&mut self, heading_rad: f64) {
        self.heading_rad = heading_rad;
    }
}

impl HeadingSensor for SimHeadingSensor {
    fn heading_rad(&self) -> f64 {
        if self.inverted {
            -self.heading_rad
        }
        else {
            self.heading_rad
        }
    }
}

impl SimChassis {
    /// Create a chassis at `start`, with modules capable of `max_speed_ms`.
    pub fn new(
        kinematics: SwerveKinematics,
        max_speed_ms: f64,
        start: Pose,
        gyro_inverted: bool,
    ) -> Self {
        let modules = vec![SimModule::new(max_speed_ms); kinematics.num_modules()];

        Self {
            kinematics,
            modules,
            gyro: SimHeadingSensor::new(start.heading_rad(), gyro_inverted),
            true_pose: start,
        }
    }

    /// Send setpoints to every module.
    pub fn command(&mut self, setpoints: &[ModuleState], open_loop: bool) {
        for (m, s) in self.modules.iter_mut().zip(setpoints.iter()) {
            m.set_desired_state(*s, open_loop);
        }
    }

    /// Move the chassis for `dt_s` at the velocity its modules are currently
    /// driving.
    pub fn step(&mut self, dt_s: f64) {
        let twist = self.kinematics.to_twist(&self.feedback());
        self.true_pose = self.true_pose.exp(&twist.scaled(dt_s));
        self.gyro.set_true_heading(self.true_pose.heading_rad());

        trace!("SimChassis true pose: {:?}", self.true_pose);
    }

    /// Measured state of every module, in module order.
    pub fn feedback(&self) -> Vec<ModuleState> {
        self.modules.iter().map(|m| m.state()).collect()
    }

    pub fn gyro(&self) -> &SimHeadingSensor {
        &self.gyro
    }

    pub fn modules(&self) -> &[SimModule] {
        &self.modules
    }

    pub fn true_pose(&self) -> Pose {
        self.true_pose
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_open_loop_saturates() {
        let mut m = SimModule::new(4.0);

        m.set_desired_state(ModuleState::new(2.0, 0.1), true);
        assert!((m.drv_output_norm() - 0.5).abs() < 1e-12);
        assert_eq!(m.state(), ModuleState::new(2.0, 0.1));

        m.set_desired_state(ModuleState::new(-6.0, 0.1), true);
        assert_eq!(m.drv_output_norm(), -1.0);
        assert_eq!(m.state().speed_ms, -4.0);

        // Closed loop passes straight through
        m.set_desired_state(ModuleState::new(6.0, 0.2), false);
        assert_eq!(m.state(), ModuleState::new(6.0, 0.2));
    }

    #[test]
    fn test_inverted_gyro() {
        let gyro = SimHeadingSensor::new(0.3, true);
        assert_eq!(gyro.heading_rad(), -0.3);
    }
}

//! Parameters structure for the Drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::DrivetrainError;
use crate::{geom::Pose, kinematics::ModuleGeometry, pose_ctrl};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the Drivetrain.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- TIMING ----

    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub period_s: f64,

    // ---- GEOMETRY ----

    /// The position of each module's contact point in the robot body frame,
    /// relative to the centre of rotation. Sets the module order used
    /// everywhere.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: Vec<[f64; 2]>,

    /// Pose the robot starts at, as `[x_m, y_m, heading_rad]`.
    ///
    /// Frame: Field
    pub initial_pose: [f64; 3],

    // ---- CAPABILITIES ----

    /// Maximum module ground speed.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum rate of change of the operator's linear velocity demands.
    /// Zero disables limiting.
    ///
    /// Units: meters/second^2
    pub drive_rate_limit_mss: f64,

    /// Maximum rate of change of the operator's turn rate demand. Zero
    /// disables limiting.
    ///
    /// Units: radians/second^2
    pub steer_rate_limit_radss: f64,

    // ---- SENSORS ----

    /// Set if the heading sensor is mounted such that its reading increases
    /// clockwise.
    pub gyro_inverted: bool,

    // ---- CONTROL ----

    /// Pose controller parameters
    pub pose_ctrl: pose_ctrl::Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    ///
    /// Module geometry is checked by the kinematics itself.
    pub fn validate(&self) -> Result<(), DrivetrainError> {
        if !(self.period_s > 0.0) {
            return Err(DrivetrainError::InvalidParams(format!(
                "period_s must be positive, found {}", self.period_s
            )));
        }

        if !(self.max_speed_ms > 0.0) {
            return Err(DrivetrainError::InvalidParams(format!(
                "max_speed_ms must be positive, found {}", self.max_speed_ms
            )));
        }

        let pc = &self.pose_ctrl;
        if pc.lin_k_p < 0.0 || pc.head_k_p < 0.0 || pc.max_turn_rate_rads < 0.0 {
            return Err(DrivetrainError::InvalidParams(
                "pose_ctrl gains and limits must not be negative".into()
            ));
        }

        Ok(())
    }

    /// Module geometry in module order.
    pub fn module_geometries(&self) -> Vec<ModuleGeometry> {
        self.module_pos_m_rb
            .iter()
            .map(|p| ModuleGeometry::from(*p))
            .collect()
    }

    pub fn initial_pose(&self) -> Pose {
        Pose::new(self.initial_pose[0], self.initial_pose[1], self.initial_pose[2])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_shipped_params() {
        let params: Params = util::params::from_str(
            include_str!("../../../params/drivetrain.toml")
        ).unwrap();

        params.validate().unwrap();
        assert_eq!(params.module_geometries().len(), 4);
        assert_eq!(params.initial_pose(), Pose::origin());
        assert!(params.gyro_inverted);
    }

    #[test]
    fn test_invalid_period() {
        let mut params: Params = util::params::from_str(
            include_str!("../../../params/drivetrain.toml")
        ).unwrap();
        params.period_s = 0.0;

        assert!(matches!(
            params.validate(),
            Err(DrivetrainError::InvalidParams(_))
        ));
    }
}

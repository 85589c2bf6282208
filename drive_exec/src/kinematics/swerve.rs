//! Swerve drive kinematics model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{DMatrix, DVector, Vector2};

// Internal
use super::{KinematicsError, ModuleGeometry, ModuleState, MIN_NUM_MODULES};
use crate::geom::Twist;
use util::raise_error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Cross products of module offsets below this are treated as collinear.
///
/// Units: meters^2
const COLLINEAR_EPS_M2: f64 = 1e-9;

/// Singular values below this are dropped when forming the pseudo-inverse.
const PINV_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics model of a swerve drive with a fixed set of modules.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    geometries: Vec<ModuleGeometry>,

    /// Pseudo-inverse of the inverse kinematics matrix, maps stacked module
    /// velocities `[vx0, vy0, vx1, vy1, ...]` to `[vx, vy, omega]`.
    fwd_kin: DMatrix<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Build the model for the given module positions.
    ///
    /// The positions must contain at least three modules which do not all lie
    /// on a single line.
    pub fn new(geometries: Vec<ModuleGeometry>) -> Result<Self, KinematicsError> {
        if geometries.len() < MIN_NUM_MODULES {
            return Err(KinematicsError::TooFewModules(geometries.len()));
        }

        if is_collinear(&geometries) {
            return Err(KinematicsError::CollinearModules);
        }

        // Each module contributes two rows to the inverse kinematics:
        //
        //  vxi = vx - omega * yi
        //  vyi = vy + omega * xi
        let mut inv_kin = DMatrix::<f64>::zeros(2 * geometries.len(), 3);
        for (i, g) in geometries.iter().enumerate() {
            inv_kin[(2 * i, 0)] = 1.0;
            inv_kin[(2 * i, 2)] = -g.y_m;
            inv_kin[(2 * i + 1, 1)] = 1.0;
            inv_kin[(2 * i + 1, 2)] = g.x_m;
        }

        let fwd_kin = inv_kin
            .pseudo_inverse(PINV_EPS)
            .map_err(KinematicsError::SingularGeometry)?;

        Ok(Self {
            geometries,
            fwd_kin,
        })
    }

    /// Number of modules in the model.
    pub fn num_modules(&self) -> usize {
        self.geometries.len()
    }

    pub fn geometries(&self) -> &[ModuleGeometry] {
        &self.geometries
    }

    /// Convert a robot relative twist into the state of each module.
    ///
    /// A module which should not move gets a steer angle of zero. Use
    /// `to_module_states_holding` to keep the previous angle instead.
    pub fn to_module_states(&self, twist: &Twist) -> Vec<ModuleState> {
        self.geometries
            .iter()
            .map(|g| ModuleState::from_velocity(&module_velocity(twist, g), 0.0))
            .collect()
    }

    /// Convert a robot relative twist into the state of each module, keeping
    /// the angle from `previous` for any module with exactly zero speed.
    ///
    /// # Panics
    /// - If `previous` does not hold one state per module.
    pub fn to_module_states_holding(
        &self,
        twist: &Twist,
        previous: &[ModuleState],
    ) -> Vec<ModuleState> {
        self.check_num_states(previous.len());

        let states: Vec<ModuleState> = self.geometries
            .iter()
            .zip(previous.iter())
            .map(|(g, p)| ModuleState::from_velocity(&module_velocity(twist, g), p.angle_rad))
            .collect();

        trace!("Module states for {:?}: {:?}", twist, states);

        states
    }

    /// Find the robot relative twist that best explains the given module
    /// states.
    ///
    /// This is the least squares solution across all modules, so
    /// inconsistent states (wheel slip, noise) produce the twist with the
    /// smallest squared residual.
    ///
    /// # Panics
    /// - If `states` does not hold one state per module.
    pub fn to_twist(&self, states: &[ModuleState]) -> Twist {
        self.check_num_states(states.len());

        let mut module_vels = DVector::<f64>::zeros(2 * states.len());
        for (i, s) in states.iter().enumerate() {
            let v = s.velocity();
            module_vels[2 * i] = v[0];
            module_vels[2 * i + 1] = v[1];
        }

        let twist = &self.fwd_kin * module_vels;

        Twist::new(twist[0], twist[1], twist[2])
    }

    /// Fail fast on a number of module states that doesn't match the model.
    fn check_num_states(&self, num_states: usize) {
        if num_states == 0 || num_states != self.geometries.len() {
            raise_error!(
                "Expected {} module states but got {}",
                self.geometries.len(),
                num_states
            );
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Velocity of a module's contact point for the given twist.
fn module_velocity(twist: &Twist, geometry: &ModuleGeometry) -> Vector2<f64> {
    Vector2::new(
        twist.vx_ms - twist.omega_rads * geometry.y_m,
        twist.vy_ms + twist.omega_rads * geometry.x_m,
    )
}

/// Returns true if all modules lie on one line.
fn is_collinear(geometries: &[ModuleGeometry]) -> bool {
    let origin = geometries[0].position_m();

    for (i, a) in geometries.iter().enumerate().skip(1) {
        for b in geometries.iter().skip(i + 1) {
            let da = a.position_m() - origin;
            let db = b.position_m() - origin;

            if (da[0] * db[1] - da[1] * db[0]).abs() > COLLINEAR_EPS_M2 {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn square_drive() -> SwerveKinematics {
        SwerveKinematics::new(vec![
            ModuleGeometry::new(0.3, 0.3),
            ModuleGeometry::new(0.3, -0.3),
            ModuleGeometry::new(-0.3, 0.3),
            ModuleGeometry::new(-0.3, -0.3),
        ])
        .unwrap()
    }

    fn assert_twist_close(a: &Twist, b: &Twist, tol: f64) {
        assert!(
            (a.vx_ms - b.vx_ms).abs() < tol
                && (a.vy_ms - b.vy_ms).abs() < tol
                && (a.omega_rads - b.omega_rads).abs() < tol,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_bad_geometry() {
        let two = vec![ModuleGeometry::new(0.3, 0.3), ModuleGeometry::new(-0.3, 0.3)];
        assert!(matches!(
            SwerveKinematics::new(two),
            Err(KinematicsError::TooFewModules(2))
        ));

        let line = vec![
            ModuleGeometry::new(0.0, 0.0),
            ModuleGeometry::new(0.3, 0.3),
            ModuleGeometry::new(-0.6, -0.6),
            ModuleGeometry::new(0.9, 0.9),
        ];
        assert!(matches!(
            SwerveKinematics::new(line),
            Err(KinematicsError::CollinearModules)
        ));
    }

    #[test]
    fn test_pure_translation() {
        let kin = square_drive();
        let states = kin.to_module_states(&Twist::new(1.0, 1.0, 0.0));

        for s in states {
            assert!((s.speed_ms - 2f64.sqrt()).abs() < 1e-12);
            assert!((s.angle_rad - FRAC_PI_4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pure_rotation() {
        let kin = square_drive();
        let states = kin.to_module_states(&Twist::new(0.0, 0.0, 1.0));

        // Every wheel is tangent to the circle through it
        for (s, g) in states.iter().zip(kin.geometries()) {
            assert!((s.speed_ms - g.position_m().norm()).abs() < 1e-12);
            assert!(s.velocity().dot(&g.position_m()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let kin = square_drive();

        for &vx in &[-3.0, -0.5, 0.0, 1.2, 4.0] {
            for &vy in &[-2.0, 0.0, 0.7, 3.1] {
                for &omega in &[-6.0, -0.1, 0.0, 2.5] {
                    let twist = Twist::new(vx, vy, omega);
                    let back = kin.to_twist(&kin.to_module_states(&twist));
                    assert_twist_close(&twist, &back, 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_three_modules() {
        let kin = SwerveKinematics::new(vec![
            ModuleGeometry::new(0.4, 0.0),
            ModuleGeometry::new(-0.2, 0.35),
            ModuleGeometry::new(-0.2, -0.35),
        ])
        .unwrap();

        let twist = Twist::new(0.8, -1.1, 1.7);
        let back = kin.to_twist(&kin.to_module_states(&twist));
        assert_twist_close(&twist, &back, 1e-6);
    }

    #[test]
    fn test_least_squares_averages_noise() {
        let kin = square_drive();

        // One wheel reads fast, the rest are exact. The solution lies between
        // the two.
        let mut states = kin.to_module_states(&Twist::new(1.0, 0.0, 0.0));
        states[0].speed_ms = 1.4;

        let twist = kin.to_twist(&states);
        assert!(twist.vx_ms > 1.0 && twist.vx_ms < 1.4);
    }

    #[test]
    fn test_zero_speed_holds_angle() {
        let kin = square_drive();
        let previous = vec![ModuleState::new(1.0, 0.5); 4];

        let states = kin.to_module_states_holding(&Twist::zero(), &previous);
        for s in states {
            assert_eq!(s, ModuleState::new(0.0, 0.5));
        }

        // The stateless conversion defaults to zero
        for s in kin.to_module_states(&Twist::zero()) {
            assert_eq!(s, ModuleState::new(0.0, 0.0));
        }
    }

    #[test]
    #[should_panic]
    fn test_wrong_num_states() {
        let kin = square_drive();
        kin.to_twist(&[ModuleState::default(); 3]);
    }

    #[test]
    #[should_panic]
    fn test_empty_states() {
        let kin = square_drive();
        kin.to_twist(&[]);
    }
}

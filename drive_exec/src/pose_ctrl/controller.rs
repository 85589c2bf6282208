//! # Pose controller
//!
//! Error calculations and control laws for pose control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::Params;
use crate::geom::{Pose, Twist};
use util::maths::{clamp, get_ang_dist};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose controller.
#[derive(Debug, Clone)]
pub struct PoseController {
    params: Params,
}

/// Error between the current pose and the target, in the robot frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct PoseError {
    /// Distance to the target along the robot's X axis, positive if the
    /// target is ahead.
    ///
    /// Units: meters
    pub along_m: f64,

    /// Distance to the target along the robot's Y axis, positive if the
    /// target is to the left.
    ///
    /// Units: meters
    pub lateral_m: f64,

    /// Signed angle to turn through to reach the target heading, positive
    /// anticlockwise, in the range (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseController {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Compute the error between the current pose and the target position and
    /// heading.
    pub fn calc_error(
        &self,
        current: &Pose,
        target: &Pose,
        target_heading_rad: f64,
    ) -> PoseError {
        let err_m_body = current.to_body(&current.translation_to(target));

        PoseError {
            along_m: err_m_body[0],
            lateral_m: err_m_body[1],
            heading_rad: get_ang_dist(current.heading_rad(), target_heading_rad),
        }
    }

    /// Calculate the twist demand which moves the robot from `current`
    /// towards `target`.
    ///
    /// The linear speed of the demand never exceeds `|target_speed_ms|`.
    ///
    /// The returned twist is robot relative and can be passed straight to
    /// the kinematics.
    pub fn calculate(
        &self,
        current: &Pose,
        target: &Pose,
        target_speed_ms: f64,
        target_heading_rad: f64,
    ) -> Twist {
        let error = self.calc_error(current, target, target_heading_rad);

        // Translation, limited to the approach speed
        let mut vx_ms = self.params.lin_k_p * error.along_m;
        let mut vy_ms = self.params.lin_k_p * error.lateral_m;

        let speed_ms = (vx_ms * vx_ms + vy_ms * vy_ms).sqrt();
        let speed_limit_ms = target_speed_ms.abs();
        if speed_ms > speed_limit_ms {
            let scale = speed_limit_ms / speed_ms;
            vx_ms *= scale;
            vy_ms *= scale;
        }

        // Heading
        let omega_rads = clamp(
            &(self.params.head_k_p * error.heading_rad),
            &(-self.params.max_turn_rate_rads),
            &self.params.max_turn_rate_rads,
        );

        trace!(
            "PoseCtrl error: {:?}, demand: ({:.3}, {:.3}, {:.3})",
            error,
            vx_ms,
            vy_ms,
            omega_rads
        );

        Twist::new(vx_ms, vy_ms, omega_rads)
    }
}

impl PoseError {
    /// Distance to the target position.
    ///
    /// Units: meters
    pub fn distance_m(&self) -> f64 {
        self.along_m.hypot(self.lateral_m)
    }

    /// Returns true if both the position and heading errors are inside the
    /// given tolerances.
    pub fn is_within(&self, lin_tolerance_m: f64, head_tolerance_rad: f64) -> bool {
        self.distance_m() < lin_tolerance_m && self.heading_rad.abs() < head_tolerance_rad
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD_S: f64 = 0.02;

    fn controller() -> PoseController {
        PoseController::new(Params {
            lin_k_p: 2.0,
            head_k_p: 3.0,
            max_turn_rate_rads: 2.0,
            lin_tolerance_m: 0.01,
            head_tolerance_rad: 0.01,
        })
    }

    /// Run the controller against a perfect integrator, returning the
    /// distance to target at every cycle.
    fn simulate(
        ctrl: &PoseController,
        start: Pose,
        target: Pose,
        speed_ms: f64,
        num_cycles: usize,
    ) -> (Pose, Vec<f64>) {
        let mut pose = start;
        let mut dists = vec![pose.distance_to(&target)];

        for _ in 0..num_cycles {
            let twist = ctrl.calculate(&pose, &target, speed_ms, target.heading_rad());
            pose = pose.exp(&twist.scaled(PERIOD_S));
            dists.push(pose.distance_to(&target));
        }

        (pose, dists)
    }

    #[test]
    fn test_converges_straight() {
        let ctrl = controller();
        let target = Pose::new(2.0, 0.0, 0.0);
        let (pose, dists) = simulate(&ctrl, Pose::origin(), target, 1.0, 500);

        // Reaches within 1 cm
        let arrived = dists.iter().position(|d| *d < 0.01);
        assert!(arrived.is_some());

        // Never moves away from the target
        for w in dists.windows(2) {
            assert!(w[1] <= w[0] + 1e-12, "{} > {}", w[1], w[0]);
        }

        // Never crosses over it
        assert!(pose.x_m() <= 2.0);
        assert!(pose.heading_rad().abs() < 1e-12);
    }

    #[test]
    fn test_converges_with_turn() {
        let ctrl = controller();
        let start = Pose::new(1.0, -1.0, 2.5);
        let target = Pose::new(-0.5, 1.5, -0.5);
        let (pose, _) = simulate(&ctrl, start, target, 1.5, 1000);

        let error = ctrl.calc_error(&pose, &target, target.heading_rad());
        assert!(error.is_within(0.01, 0.01), "{:?}", error);
    }

    #[test]
    fn test_speed_limited() {
        let ctrl = controller();
        let twist = ctrl.calculate(&Pose::origin(), &Pose::new(3.0, 4.0, 0.0), 0.5, 0.0);

        assert!((twist.linear_norm() - 0.5).abs() < 1e-12);

        // Direction kept
        assert!((twist.vy_ms / twist.vx_ms - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_error_in_robot_frame() {
        let ctrl = controller();

        // Facing +Y, a target at +X is to the right
        let current = Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let error = ctrl.calc_error(&current, &Pose::new(1.0, 0.0, 0.0), 0.0);

        assert!(error.along_m.abs() < 1e-12);
        assert!((error.lateral_m + 1.0).abs() < 1e-12);
        assert!((error.heading_rad + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_heading_error_wraps() {
        let ctrl = controller();
        let current = Pose::new(0.0, 0.0, (-170f64).to_radians());
        let error = ctrl.calc_error(&current, &current, 170f64.to_radians());

        // 20 deg the short way, which is clockwise so negative
        assert!((error.heading_rad.to_degrees() - (-20.0)).abs() < 1e-9);

        let current = Pose::new(0.0, 0.0, 170f64.to_radians());
        let error = ctrl.calc_error(&current, &current, (-170f64).to_radians());

        assert!((error.heading_rad.to_degrees() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_rate_limited() {
        let ctrl = controller();
        let twist = ctrl.calculate(&Pose::origin(), &Pose::origin(), 1.0, 3.0);

        assert_eq!(twist.omega_rads, 2.0);
        assert_eq!(twist.linear_norm(), 0.0);
    }
}

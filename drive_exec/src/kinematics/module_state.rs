//! Module state and geometry types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The speed and steer angle of a single swerve module.
///
/// A negative speed drives the wheel backwards through the same angle, which
/// is physically the same as a positive speed at the opposite angle. Nothing
/// in this crate flips between the two, so the sign is always preserved.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Wheel ground speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steer angle relative to the body X axis.
    ///
    /// Units: radians,
    /// Frame: Robot body
    pub angle_rad: f64,
}

/// Position of a module's contact point relative to the centre of rotation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleGeometry {
    /// Units: meters,
    /// Frame: Robot body
    pub x_m: f64,

    /// Units: meters,
    /// Frame: Robot body
    pub y_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleState {
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self { speed_ms, angle_rad }
    }

    /// Build a state from a module velocity vector in the body frame.
    ///
    /// If the vector is exactly zero the steer angle is undefined and
    /// `hold_angle_rad` is used instead.
    pub fn from_velocity(vel_ms: &Vector2<f64>, hold_angle_rad: f64) -> Self {
        let speed_ms = vel_ms.norm();

        let angle_rad = if speed_ms == 0.0 {
            hold_angle_rad
        }
        else {
            vel_ms[1].atan2(vel_ms[0])
        };

        Self { speed_ms, angle_rad }
    }

    /// The module velocity vector in the body frame.
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(
            self.speed_ms * self.angle_rad.cos(),
            self.speed_ms * self.angle_rad.sin(),
        )
    }

    /// Return this state with zero speed, keeping the steer angle.
    pub fn stopped(&self) -> Self {
        Self::new(0.0, self.angle_rad)
    }
}

impl ModuleGeometry {
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self { x_m, y_m }
    }

    pub fn position_m(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }
}

impl From<[f64; 2]> for ModuleGeometry {
    fn from(pos_m: [f64; 2]) -> Self {
        Self::new(pos_m[0], pos_m[1])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_from_velocity() {
        let state = ModuleState::from_velocity(&Vector2::new(0.0, 2.0), 0.3);
        assert!((state.speed_ms - 2.0).abs() < 1e-12);
        assert!((state.angle_rad - FRAC_PI_2).abs() < 1e-12);

        // Zero velocity holds the given angle
        let state = ModuleState::from_velocity(&Vector2::zeros(), 0.3);
        assert_eq!(state, ModuleState::new(0.0, 0.3));
    }

    #[test]
    fn test_negative_speed_velocity() {
        // Backwards at 0 is the same velocity as forwards at pi
        let back = ModuleState::new(-1.0, 0.0).velocity();
        let flipped = ModuleState::new(1.0, PI).velocity();

        assert!((back - flipped).norm() < 1e-12);
    }
}

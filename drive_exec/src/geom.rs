//! # Geometry types
//!
//! Planar pose and velocity types shared by every other module.
//!
//! Frames follow the usual convention: X forward, Y left, angles anticlockwise
//! positive about Z. The field frame is fixed, the body frame moves with the
//! robot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this rotation the exponential map uses its series expansion.
const EXP_SMALL_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading) of the robot in the field frame.
///
/// Heading is always held in the range (-pi, pi].
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Pose {
    /// Position in the field frame.
    ///
    /// Units: meters
    position_m: Vector2<f64>,

    /// Angle of the body X axis to the field X axis.
    ///
    /// Units: radians
    heading_rad: f64,
}

/// A planar velocity.
///
/// Whether the linear components are expressed in the body frame or the
/// field frame depends on where the twist came from, see
/// `Twist::from_field_relative` and `Twist::to_field_relative`.
///
/// A twist multiplied by a time step (`Twist::scaled`) is also used to
/// describe a body-frame displacement, see `Pose::exp`.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Velocity along the X axis.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Velocity along the Y axis.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Rotation rate about Z.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose, wrapping the heading.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self::from_position(Vector2::new(x_m, y_m), heading_rad)
    }

    /// Create a new pose from a position vector, wrapping the heading.
    pub fn from_position(position_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// The field origin, facing along field X.
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x_m(&self) -> f64 {
        self.position_m[0]
    }

    pub fn y_m(&self) -> f64 {
        self.position_m[1]
    }

    pub fn position_m(&self) -> Vector2<f64> {
        self.position_m
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    /// Return a copy of this pose with a different heading.
    pub fn with_heading(&self, heading_rad: f64) -> Self {
        Self::from_position(self.position_m, heading_rad)
    }

    /// Rotation taking body frame vectors into the field frame.
    pub fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(self.heading_rad)
    }

    /// Express a field frame vector in this pose's body frame.
    pub fn to_body(&self, vec_field: &Vector2<f64>) -> Vector2<f64> {
        self.rotation().inverse() * *vec_field
    }

    /// Express a body frame vector in the field frame.
    pub fn to_field(&self, vec_body: &Vector2<f64>) -> Vector2<f64> {
        self.rotation() * *vec_body
    }

    /// Field frame vector from this pose's position to `other`'s.
    pub fn translation_to(&self, other: &Pose) -> Vector2<f64> {
        other.position_m - self.position_m
    }

    /// Straight line distance to another pose.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        self.translation_to(other).norm()
    }

    /// Compose a body frame displacement onto this pose.
    ///
    /// `delta` holds the displacement `(dx, dy, dtheta)` travelled over one
    /// step with constant body velocity, i.e. a twist already multiplied by
    /// the step duration. The robot is assumed to follow a circular arc over
    /// the step, which reduces to a straight line when `dtheta` is zero.
    pub fn exp(&self, delta: &Twist) -> Pose {
        let dtheta = delta.omega_rads;

        // sin(dθ)/dθ and (1 - cos(dθ))/dθ, expanded about zero for tiny turns
        let (s, c) = if dtheta.abs() < EXP_SMALL_ANGLE_RAD {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        }
        else {
            (dtheta.sin() / dtheta, (1.0 - dtheta.cos()) / dtheta)
        };

        let local_m = Vector2::new(
            delta.vx_ms * s - delta.vy_ms * c,
            delta.vx_ms * c + delta.vy_ms * s,
        );

        Pose::from_position(
            self.position_m + self.to_field(&local_m),
            self.heading_rad + dtheta,
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::origin()
    }
}

impl Twist {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    /// A twist with no motion.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Convert a field relative velocity into a robot relative twist.
    ///
    /// `heading_rad` must be the robot heading at the start of the current
    /// cycle.
    pub fn from_field_relative(
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
        heading_rad: f64,
    ) -> Self {
        let body = Rotation2::new(-heading_rad) * Vector2::new(vx_ms, vy_ms);

        Self::new(body[0], body[1], omega_rads)
    }

    /// Convert this robot relative twist into a field relative one.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        let field = Rotation2::new(heading_rad) * self.linear();

        Self::new(field[0], field[1], self.omega_rads)
    }

    /// The linear part of the twist.
    pub fn linear(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    /// Magnitude of the linear part of the twist.
    pub fn linear_norm(&self) -> f64 {
        self.linear().norm()
    }

    /// Multiply every component by `factor`.
    ///
    /// Scaling by a time step gives the displacement over that step.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.vx_ms * factor,
            self.vy_ms * factor,
            self.omega_rads * factor,
        )
    }
}

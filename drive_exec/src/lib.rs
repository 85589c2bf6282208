//! # Drive library.
//!
//! This library allows other crates in the workspace (and the benches) to access the swerve drive
//! motion core.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry types - poses and twists in the plane
pub mod geom;

/// Kinematics - converts robot twists into module states and back again
pub mod kinematics;

/// Odometry - dead reckons the robot pose from module feedback and heading
pub mod odometry;

/// Pose control - drives the robot towards a target pose
pub mod pose_ctrl;

/// Module interfaces - capabilities the drive core needs from the hardware
pub mod module_if;

/// Drivetrain - owns the drive state and runs the control cycle
pub mod drivetrain;

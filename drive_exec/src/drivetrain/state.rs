//! Implementations for the Drivetrain state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{DriveCmd, DrivetrainError, Params, SlewRateLimiter};
use crate::{
    geom::{Pose, Twist},
    kinematics::{desaturate, ModuleState, SwerveKinematics},
    odometry::Odometry,
    pose_ctrl::{PoseController, PoseError},
};
use util::{
    archive::{Archived, Archiver},
    maths::wrap_pi,
    module::{MakeSafe, State},
    raise_error,
    session::{get_elapsed_seconds, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drivetrain module state
#[derive(Default)]
pub struct Drivetrain {
    /// Everything that only exists once the drivetrain is initialised.
    core: Option<DriveCore>,

    /// The motion command currently being executed
    pub(crate) current_cmd: Option<DriveCmd>,

    pub(crate) report: StatusReport,
    pub(crate) output: Option<OutputData>,

    arch_pose: Archiver,
    arch_setpoints: Archiver,
}

/// Initialised drivetrain internals.
struct DriveCore {
    params: Params,

    /// Pose estimate, written only by `Drivetrain::proc`
    odometry: Odometry,

    pose_ctrl: PoseController,

    vx_limiter: SlewRateLimiter,
    vy_limiter: SlewRateLimiter,
    omega_limiter: SlewRateLimiter,

    /// Corrected heading reading which is taken as zero. Set on the first
    /// cycle so that the robot starts at the initial pose heading.
    ///
    /// Units: radians
    heading_offset_rad: Option<f64>,

    /// Setpoints sent on the previous cycle, used to hold steer angles.
    setpoints: Vec<ModuleState>,
}

/// Input data to the Drivetrain.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Raw heading sensor reading at the start of this cycle.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Measured state of every module, in module order.
    pub module_states: Vec<ModuleState>,

    /// A new command, or `None` to continue with the current command.
    pub cmd: Option<DriveCmd>,
}

/// Output from the Drivetrain that the module drivers must execute.
#[derive(Debug, Clone, Serialize)]
pub struct OutputData {
    /// Module setpoints, in module order.
    pub setpoints: Vec<ModuleState>,

    /// If set the drive motors shall be driven open loop.
    pub open_loop: bool,

    /// Pose estimate after this cycle.
    pub pose: Pose,
}

/// Status report for Drivetrain processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The setpoints were scaled down to the maximum module speed.
    pub desaturated: bool,

    /// A pose target is being driven to and the robot is within tolerance
    /// of it.
    pub at_target: bool,

    /// Error to the pose target, if one is being driven to.
    pub pose_error: Option<PoseError>,
}

/// Archive row for the pose estimate.
#[derive(Serialize)]
struct PoseRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_rad: f64,
    desaturated: bool,
    at_target: bool,
}

/// Archive row for one module setpoint.
#[derive(Serialize)]
struct SetpointRecord {
    time_s: f64,
    module: usize,
    speed_ms: f64,
    angle_rad: f64,
    open_loop: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Drivetrain {
    type InitData = Params;
    type InitError = DrivetrainError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DrivetrainError;

    /// Initialise the Drivetrain module.
    ///
    /// Expected init data is the already loaded parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.core = Some(DriveCore::new(init_data)?);

        self.arch_pose = Archiver::from_path(session, "drivetrain/pose.csv")
            .map_err(|e| DrivetrainError::ArchiveInitError(e.to_string()))?;
        self.arch_setpoints = Archiver::from_path(session, "drivetrain/setpoints.csv")
            .map_err(|e| DrivetrainError::ArchiveInitError(e.to_string()))?;

        Ok(())
    }

    /// Perform one control cycle.
    ///
    /// # Panics
    /// - If the number of module states in the input (or in a
    ///   `DriveCmd::ModuleStates` command) doesn't match the number of
    ///   modules.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let core = self.core.as_mut().ok_or(DrivetrainError::NotInitialised)?;

        // Reject malformed input before any state is touched
        core.check_input(input_data);

        // Clear the status report
        self.report = StatusReport::default();

        // Handle any new command. One-shot commands are actioned here, motion
        // commands replace the current command.
        let mut reset_to = None;
        if let Some(ref cmd) = input_data.cmd {
            match cmd {
                DriveCmd::ZeroHeading => core.zero_heading(input_data.heading_rad),
                DriveCmd::ResetPose(pose) => reset_to = Some(*pose),
                motion => {
                    debug!("New drive command: {:?}", motion);
                    self.current_cmd = Some(motion.clone());
                }
            }
        }

        let heading_rad = core.correct_heading(input_data.heading_rad);

        // Commands see the estimate from the previous cycle
        let (setpoints, open_loop) = core.calc_setpoints(
            self.current_cmd.as_ref(),
            heading_rad,
            &mut self.report,
        );

        // Advance the estimate with this cycle's feedback
        let mut pose = core.odometry.update(heading_rad, &input_data.module_states);
        if let Some(p) = reset_to {
            core.odometry.reset_pose(p, heading_rad);
            pose = core.odometry.pose();
        }

        let output = OutputData {
            setpoints,
            open_loop,
            pose,
        };

        trace!(
            "Drivetrain output:\n    setpoints: {:?}\n    pose: {:?}",
            output.setpoints,
            output.pose
        );

        self.output = Some(output.clone());

        Ok((output, self.report))
    }
}

impl Archived for Drivetrain {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let output = match self.output {
            Some(ref o) => o,
            None => return Ok(()),
        };

        let time_s = get_elapsed_seconds();

        self.arch_pose.serialise(PoseRecord {
            time_s,
            x_m: output.pose.x_m(),
            y_m: output.pose.y_m(),
            heading_rad: output.pose.heading_rad(),
            desaturated: self.report.desaturated,
            at_target: self.report.at_target,
        })?;

        for (module, s) in output.setpoints.iter().enumerate() {
            self.arch_setpoints.serialise(SetpointRecord {
                time_s,
                module,
                speed_ms: s.speed_ms,
                angle_rad: s.angle_rad,
                open_loop: output.open_loop,
            })?;
        }

        Ok(())
    }
}

impl Drivetrain {
    /// Create an initialised drivetrain which does not write archives.
    pub fn new(params: Params) -> Result<Self, DrivetrainError> {
        Ok(Self {
            core: Some(DriveCore::new(params)?),
            ..Default::default()
        })
    }

    pub fn is_initialised(&self) -> bool {
        self.core.is_some()
    }

    /// The current pose estimate, or `None` if not initialised.
    pub fn pose(&self) -> Option<Pose> {
        self.core.as_ref().map(|c| c.odometry.pose())
    }

    /// The kinematics model, or `None` if not initialised.
    pub fn kinematics(&self) -> Option<&SwerveKinematics> {
        self.core.as_ref().map(|c| c.odometry.kinematics())
    }
}

impl MakeSafe for Drivetrain {
    /// Abandon the current command and stop, holding steer angles.
    fn make_safe(&mut self) {
        if !self.is_safe() {
            warn!("Drivetrain made safe, stopping");
            self.current_cmd = Some(DriveCmd::Stop);
        }
    }

    fn is_safe(&self) -> bool {
        self.current_cmd == Some(DriveCmd::Stop)
    }
}

impl DriveCore {
    fn new(params: Params) -> Result<Self, DrivetrainError> {
        params.validate()?;

        let kinematics = SwerveKinematics::new(params.module_geometries())?;
        let num_modules = kinematics.num_modules();
        let initial_pose = params.initial_pose();

        info!(
            "Drivetrain initialised with {} modules, max speed {:.2} m/s, starting at {:?}",
            num_modules,
            params.max_speed_ms,
            initial_pose
        );

        Ok(Self {
            odometry: Odometry::new(
                kinematics,
                initial_pose,
                initial_pose.heading_rad(),
                params.period_s,
            ),
            pose_ctrl: PoseController::new(params.pose_ctrl.clone()),
            vx_limiter: SlewRateLimiter::new(params.drive_rate_limit_mss),
            vy_limiter: SlewRateLimiter::new(params.drive_rate_limit_mss),
            omega_limiter: SlewRateLimiter::new(params.steer_rate_limit_radss),
            heading_offset_rad: None,
            setpoints: vec![ModuleState::default(); num_modules],
            params,
        })
    }

    /// Raise an error if the feedback, or a `ModuleStates` command, doesn't
    /// have one entry per module.
    fn check_input(&self, input_data: &InputData) {
        let num_modules = self.odometry.kinematics().num_modules();

        if input_data.module_states.len() != num_modules {
            raise_error!(
                "Expected feedback from {} modules but got {}",
                num_modules,
                input_data.module_states.len()
            );
        }

        if let Some(DriveCmd::ModuleStates(ref states)) = input_data.cmd {
            if states.len() != num_modules {
                raise_error!(
                    "Expected {} module setpoints but got {}",
                    num_modules,
                    states.len()
                );
            }
        }
    }

    /// Apply the mounting sign to a raw heading reading.
    fn signed_heading(&self, raw_heading_rad: f64) -> f64 {
        if self.params.gyro_inverted {
            -raw_heading_rad
        }
        else {
            raw_heading_rad
        }
    }

    /// Convert a raw heading reading into the field heading.
    fn correct_heading(&mut self, raw_heading_rad: f64) -> f64 {
        let signed_rad = self.signed_heading(raw_heading_rad);
        let initial_heading_rad = self.params.initial_pose[2];

        let offset_rad = *self.heading_offset_rad
            .get_or_insert(signed_rad - initial_heading_rad);

        wrap_pi(signed_rad - offset_rad)
    }

    /// Take the given raw reading as the zero heading.
    fn zero_heading(&mut self, raw_heading_rad: f64) {
        info!("Heading zeroed at raw reading {:.2} deg", raw_heading_rad.to_degrees());
        self.heading_offset_rad = Some(self.signed_heading(raw_heading_rad));
    }

    /// Calculate the desaturated module setpoints for the current command.
    ///
    /// Returns the setpoints and whether they should be driven open loop.
    fn calc_setpoints(
        &mut self,
        cmd: Option<&DriveCmd>,
        heading_rad: f64,
        report: &mut StatusReport,
    ) -> (Vec<ModuleState>, bool) {
        let pose = self.odometry.pose();
        let period_s = self.params.period_s;

        let (mut setpoints, open_loop) = match cmd {
            Some(DriveCmd::Twist { twist, field_relative, open_loop }) => {
                let vx_ms = self.vx_limiter.calculate(twist.vx_ms, period_s);
                let vy_ms = self.vy_limiter.calculate(twist.vy_ms, period_s);
                let omega_rads = self.omega_limiter.calculate(twist.omega_rads, period_s);

                let robot_twist = if *field_relative {
                    Twist::from_field_relative(vx_ms, vy_ms, omega_rads, heading_rad)
                }
                else {
                    Twist::new(vx_ms, vy_ms, omega_rads)
                };

                (self.twist_to_states(&robot_twist), *open_loop)
            },
            Some(DriveCmd::DriveToPose { target, target_speed_ms, target_heading_rad }) => {
                let error = self.pose_ctrl.calc_error(&pose, target, *target_heading_rad);
                let pc = self.pose_ctrl.params();

                report.pose_error = Some(error);
                report.at_target = error.is_within(pc.lin_tolerance_m, pc.head_tolerance_rad);

                let twist = self.pose_ctrl.calculate(
                    &pose,
                    target,
                    *target_speed_ms,
                    *target_heading_rad,
                );

                (self.twist_to_states(&twist), false)
            },
            Some(DriveCmd::ModuleStates(states)) => (states.clone(), false),
            // Stop, or nothing to do
            _ => (self.setpoints.iter().map(|s| s.stopped()).collect(), false),
        };

        // Operator demands ramp up from rest whenever they resume
        if !matches!(cmd, Some(DriveCmd::Twist { .. })) {
            self.vx_limiter.reset(0.0);
            self.vy_limiter.reset(0.0);
            self.omega_limiter.reset(0.0);
        }

        report.desaturated = desaturate(&mut setpoints, self.params.max_speed_ms);
        if report.desaturated {
            debug!("Setpoints limited to {:.2} m/s", self.params.max_speed_ms);
        }

        self.setpoints = setpoints.clone();

        (setpoints, open_loop)
    }

    /// Module states for a robot relative twist, holding the previous steer
    /// angle of any module that stops.
    fn twist_to_states(&self, twist: &Twist) -> Vec<ModuleState> {
        self.odometry
            .kinematics()
            .to_module_states_holding(twist, &self.setpoints)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{module_if::SimChassis, pose_ctrl};
    use std::f64::consts::FRAC_PI_2;
    use std::panic::{self, AssertUnwindSafe};

    fn params() -> Params {
        Params {
            period_s: 0.02,
            module_pos_m_rb: vec![[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
            initial_pose: [0.0, 0.0, 0.0],
            max_speed_ms: 4.0,
            drive_rate_limit_mss: 0.0,
            steer_rate_limit_radss: 0.0,
            gyro_inverted: false,
            pose_ctrl: pose_ctrl::Params {
                lin_k_p: 2.0,
                head_k_p: 3.0,
                max_turn_rate_rads: 2.0,
                lin_tolerance_m: 0.01,
                head_tolerance_rad: 0.01,
            },
        }
    }

    fn input(heading_rad: f64, cmd: Option<DriveCmd>) -> InputData {
        InputData {
            heading_rad,
            module_states: vec![ModuleState::default(); 4],
            cmd,
        }
    }

    fn robot_twist(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> DriveCmd {
        DriveCmd::Twist {
            twist: Twist::new(vx_ms, vy_ms, omega_rads),
            field_relative: false,
            open_loop: false,
        }
    }

    #[test]
    fn test_not_initialised() {
        let mut dt = Drivetrain::default();
        assert!(!dt.is_initialised());
        assert!(matches!(
            dt.proc(&input(0.0, None)),
            Err(DrivetrainError::NotInitialised)
        ));
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.max_speed_ms = 0.0;
        assert!(matches!(
            Drivetrain::new(p),
            Err(DrivetrainError::InvalidParams(_))
        ));

        let mut p = params();
        p.module_pos_m_rb = vec![[0.0, 0.0], [0.1, 0.0], [0.2, 0.0]];
        assert!(matches!(
            Drivetrain::new(p),
            Err(DrivetrainError::Kinematics(_))
        ));
    }

    #[test]
    fn test_no_command_is_stopped() {
        let mut dt = Drivetrain::new(params()).unwrap();
        let (out, _) = dt.proc(&input(0.0, None)).unwrap();

        for s in out.setpoints {
            assert_eq!(s, ModuleState::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_stop_holds_angles() {
        let mut dt = Drivetrain::new(params()).unwrap();

        let (out, _) = dt.proc(&input(0.0, Some(robot_twist(0.0, 1.0, 0.0)))).unwrap();
        for s in &out.setpoints {
            assert!((s.speed_ms - 1.0).abs() < 1e-12);
            assert!((s.angle_rad - FRAC_PI_2).abs() < 1e-12);
        }

        // Command persists
        let (out, _) = dt.proc(&input(0.0, None)).unwrap();
        assert!((out.setpoints[0].speed_ms - 1.0).abs() < 1e-12);

        // A zero twist holds the steer angles too
        let (out, _) = dt.proc(&input(0.0, Some(robot_twist(0.0, 0.0, 0.0)))).unwrap();
        for s in &out.setpoints {
            assert_eq!(s.speed_ms, 0.0);
            assert!((s.angle_rad - FRAC_PI_2).abs() < 1e-12);
        }

        dt.proc(&input(0.0, Some(robot_twist(0.0, 1.0, 0.0)))).unwrap();
        let (out, _) = dt.proc(&input(0.0, Some(DriveCmd::Stop))).unwrap();
        for s in &out.setpoints {
            assert_eq!(s.speed_ms, 0.0);
            assert!((s.angle_rad - FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_field_relative() {
        let mut p = params();
        p.initial_pose = [0.0, 0.0, FRAC_PI_2];
        let mut dt = Drivetrain::new(p).unwrap();

        // Facing field +Y, driving along field +X means driving to the right
        let cmd = DriveCmd::Twist {
            twist: Twist::new(1.0, 0.0, 0.0),
            field_relative: true,
            open_loop: true,
        };
        let (out, _) = dt.proc(&input(0.0, Some(cmd))).unwrap();

        assert!(out.open_loop);
        for s in &out.setpoints {
            assert!((s.speed_ms - 1.0).abs() < 1e-12);
            assert!((s.angle_rad + FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_slew_limited() {
        let mut p = params();
        p.drive_rate_limit_mss = 10.0;
        let mut dt = Drivetrain::new(p).unwrap();

        let (out, _) = dt.proc(&input(0.0, Some(robot_twist(2.0, 0.0, 0.0)))).unwrap();
        assert!((out.setpoints[0].speed_ms - 0.2).abs() < 1e-12);

        let (out, _) = dt.proc(&input(0.0, None)).unwrap();
        assert!((out.setpoints[0].speed_ms - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_module_states_desaturated() {
        let mut dt = Drivetrain::new(params()).unwrap();

        let cmd = DriveCmd::ModuleStates(vec![
            ModuleState::new(8.0, 0.0),
            ModuleState::new(4.0, 0.1),
            ModuleState::new(-2.0, 0.2),
            ModuleState::new(0.0, 0.3),
        ]);
        let (out, rpt) = dt.proc(&input(0.0, Some(cmd))).unwrap();

        assert!(rpt.desaturated);
        assert!(!out.open_loop);
        assert_eq!(out.setpoints[0], ModuleState::new(4.0, 0.0));
        assert_eq!(out.setpoints[1], ModuleState::new(2.0, 0.1));
        assert_eq!(out.setpoints[2], ModuleState::new(-1.0, 0.2));
        assert_eq!(out.setpoints[3], ModuleState::new(0.0, 0.3));
    }

    #[test]
    fn test_reset_pose_and_zero_heading() {
        let mut dt = Drivetrain::new(params()).unwrap();

        // First cycle fixes the heading offset so the robot starts at zero
        let (out, _) = dt.proc(&input(0.7, None)).unwrap();
        assert_eq!(out.pose.heading_rad(), 0.0);

        // Turning the sensor turns the robot
        let (out, _) = dt.proc(&input(0.9, None)).unwrap();
        assert!((out.pose.heading_rad() - 0.2).abs() < 1e-12);

        // Zeroing takes the current reading as zero
        let (out, _) = dt.proc(&input(0.9, Some(DriveCmd::ZeroHeading))).unwrap();
        assert_eq!(out.pose.heading_rad(), 0.0);

        let target = Pose::new(1.5, -2.0, 0.0);
        let (out, _) = dt.proc(&input(0.9, Some(DriveCmd::ResetPose(target)))).unwrap();
        assert_eq!(out.pose, target);
        assert_eq!(dt.pose(), Some(target));

        // Stationary, so the pose stays put
        let (out, _) = dt.proc(&input(0.9, None)).unwrap();
        assert_eq!(out.pose, target);
    }

    #[test]
    fn test_drive_to_pose() {
        let mut p = params();
        p.gyro_inverted = true;
        let mut dt = Drivetrain::new(p.clone()).unwrap();
        let mut chassis = SimChassis::new(
            dt.kinematics().unwrap().clone(),
            p.max_speed_ms,
            Pose::origin(),
            true,
        );

        let target = Pose::new(2.0, 1.0, 0.0);
        let mut cmd = Some(DriveCmd::DriveToPose {
            target,
            target_speed_ms: 1.0,
            target_heading_rad: FRAC_PI_2,
        });

        let mut arrived = false;
        for _ in 0..1000 {
            let (out, rpt) = dt
                .proc(&InputData {
                    heading_rad: crate::module_if::HeadingSensor::heading_rad(chassis.gyro()),
                    module_states: chassis.feedback(),
                    cmd: cmd.take(),
                })
                .unwrap();

            chassis.command(&out.setpoints, out.open_loop);
            chassis.step(p.period_s);

            assert!(rpt.pose_error.is_some());
            if rpt.at_target {
                arrived = true;
                break;
            }
        }

        assert!(arrived);

        let truth = chassis.true_pose();
        assert!(truth.distance_to(&target) < 0.02, "{:?}", truth);
        assert!((truth.heading_rad() - FRAC_PI_2).abs() < 0.02);
    }

    #[test]
    fn test_make_safe() {
        let mut dt = Drivetrain::new(params()).unwrap();
        dt.proc(&input(0.0, Some(robot_twist(1.0, 0.0, 0.0)))).unwrap();

        assert!(!dt.is_safe());
        dt.make_safe();
        assert!(dt.is_safe());

        let (out, _) = dt.proc(&input(0.0, None)).unwrap();
        for s in out.setpoints {
            assert_eq!(s.speed_ms, 0.0);
        }
    }

    #[test]
    fn test_bad_input_leaves_state_untouched() {
        let mut p = params();
        p.drive_rate_limit_mss = 10.0;
        let mut dt = Drivetrain::new(p).unwrap();

        let bad_feedback = InputData {
            heading_rad: 0.0,
            module_states: vec![ModuleState::default(); 3],
            cmd: Some(robot_twist(2.0, 0.0, 0.0)),
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| dt.proc(&bad_feedback).ok()));
        assert!(result.is_err());
        assert_eq!(dt.current_cmd, None);
        assert!(dt.output.is_none());

        let bad_setpoints = input(0.0, Some(DriveCmd::ModuleStates(vec![ModuleState::default(); 2])));
        let result = panic::catch_unwind(AssertUnwindSafe(|| dt.proc(&bad_setpoints).ok()));
        assert!(result.is_err());
        assert_eq!(dt.current_cmd, None);

        // The limiter starts from rest as if the bad cycles never happened
        let (out, _) = dt.proc(&input(0.0, Some(robot_twist(2.0, 0.0, 0.0)))).unwrap();
        assert!((out.setpoints[0].speed_ms - 0.2).abs() < 1e-12);
        assert_eq!(dt.pose(), Some(Pose::origin()));
    }

    #[test]
    #[should_panic]
    fn test_wrong_module_states_length() {
        let mut dt = Drivetrain::new(params()).unwrap();
        dt.proc(&input(0.0, Some(DriveCmd::ModuleStates(vec![ModuleState::default(); 5]))))
            .unwrap();
    }

    #[test]
    #[should_panic]
    fn test_wrong_feedback_length() {
        let mut dt = Drivetrain::new(params()).unwrap();
        dt.proc(&InputData {
            heading_rad: 0.0,
            module_states: vec![ModuleState::default(); 3],
            cmd: None,
        })
        .unwrap();
    }
}

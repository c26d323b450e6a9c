use crate::arm_config::{ArmConfig, JointId, PlanarPosition};
use crate::arm_driver::{ArmDriver, DriverError};
use crate::arm_state::{JointState, Pose};
use crate::kinematics::{self, JointPair, KinematicsError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionError {
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
    #[error("failed writing to the actuator")]
    Driver(#[from] DriverError),
}

type Result<T> = std::result::Result<T, MotionError>;

/// Lazy linear interpolation between two angles.
///
/// Yields `steps` intermediate values for `t = i/steps`, the last one
/// exactly the target. Generating the step sequence separately from the
/// delay policy keeps interpolation testable without real time waits.
pub struct Sweep {
    start: f32,
    target: f32,
    steps: u32,
    index: u32,
}

impl Sweep {
    pub fn new(start: f32, target: f32, steps: u32) -> Sweep {
        Sweep {
            start,
            target,
            steps,
            index: 0,
        }
    }
}

impl Iterator for Sweep {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.steps {
            return None;
        }
        self.index += 1;
        if self.index == self.steps {
            return Some(self.target);
        }
        let t = self.index as f32 / self.steps as f32;
        Some(self.start + (self.target - self.start) * t)
    }
}

/// Executes moves against the actuator and owns the joint state.
///
/// Execution is cooperative and strictly serial: every move runs its full
/// step sequence before control returns to the caller, and the state is
/// committed only after the last step has been written.
pub struct ArmController {
    driver: Box<dyn ArmDriver>,
    config: ArmConfig,
    state: JointState,
    step_delay: Duration,
}

impl ArmController {
    pub fn new(driver: Box<dyn ArmDriver>, config: ArmConfig) -> ArmController {
        let state = JointState::new_home(config.clone());
        let step_delay = config.motion.step_delay();
        ArmController {
            driver,
            config,
            state,
            step_delay,
        }
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    pub fn pose(&self) -> Pose {
        self.state.pose()
    }

    /// Move the end effector to an absolute target in the sagittal plane.
    ///
    /// The target is clamped to the workspace rectangle before solving;
    /// the clamp is silent. The solver can still reject the clamped point,
    /// in which case the pose stays untouched. Returns the position
    /// actually reached.
    pub async fn move_to_position(&mut self, target: PlanarPosition) -> Result<PlanarPosition> {
        let target = self.config.clamp_to_workspace(target);
        let joints = kinematics::solve(&self.config.geometry, target)?;
        tracing::debug!(
            y = target.y,
            z = target.z,
            shoulder = joints.shoulder,
            elbow = joints.elbow,
            "moving to target"
        );
        self.sweep_arm(joints).await?;
        self.state.commit_arm(joints, target);
        Ok(target)
    }

    /// Relative move along the plane from the current end effector
    /// position.
    pub async fn move_relative(&mut self, delta_y: f32, delta_z: f32) -> Result<PlanarPosition> {
        let position = self.state.pose().position;
        self.move_to_position(PlanarPosition::new(
            position.y + delta_y,
            position.z + delta_z,
        ))
        .await
    }

    /// Return every joint to the calibrated home pose.
    ///
    /// The end effector position is the measured home position, assigned
    /// directly rather than derived from the solver.
    pub async fn go_home(&mut self) -> Result<()> {
        let home = self.config.home;
        self.set_base(home.base).await?;
        self.set_wrist(home.wrist).await?;
        self.set_gripper(home.gripper).await?;
        let joints = JointPair {
            shoulder: home.shoulder,
            elbow: home.elbow,
        };
        self.sweep_arm(joints).await?;
        self.state.commit_arm(joints, home.position);
        tracing::debug!("home position reached");
        Ok(())
    }

    /// Rotate the base. The angle is clamped to leave headroom for the
    /// base offset; the stored value is returned.
    pub async fn set_base(&mut self, angle: f32) -> Result<f32> {
        let target = self.config.clamp_base(angle);
        let start = self.state.pose().base;
        self.sweep_joint(JointId::Base, start, target).await?;
        Ok(self.state.set_base(target))
    }

    pub async fn set_wrist(&mut self, angle: f32) -> Result<f32> {
        let target = self.config.clamp_wrist(angle);
        let start = self.state.pose().wrist;
        self.sweep_joint(JointId::Wrist, start, target).await?;
        Ok(self.state.set_wrist(target))
    }

    pub async fn set_gripper(&mut self, angle: f32) -> Result<f32> {
        let target = self.config.clamp_gripper(angle);
        let start = self.state.pose().gripper;
        self.sweep_joint(JointId::Gripper, start, target).await?;
        Ok(self.state.set_gripper(target))
    }

    pub async fn open_gripper(&mut self) -> Result<f32> {
        let open = self.config.gripper.open;
        self.set_gripper(open).await
    }

    pub async fn close_gripper(&mut self, tight: bool) -> Result<f32> {
        let target = if tight {
            self.config.gripper.tight
        } else {
            self.config.gripper.calm
        };
        self.set_gripper(target).await
    }

    /// Shoulder and elbow interpolated jointly over the same step count.
    async fn sweep_arm(&mut self, target: JointPair) -> Result<()> {
        let start = self.state.pose();
        let steps = self.config.motion.steps;
        let shoulder = Sweep::new(start.shoulder, target.shoulder, steps);
        let elbow = Sweep::new(start.elbow, target.elbow, steps);
        for (shoulder_angle, elbow_angle) in shoulder.zip(elbow) {
            self.write_logical(JointId::Shoulder, shoulder_angle).await?;
            self.write_logical(JointId::Elbow, elbow_angle).await?;
            tokio::time::sleep(self.step_delay).await;
        }
        Ok(())
    }

    async fn sweep_joint(&mut self, joint: JointId, start: f32, target: f32) -> Result<()> {
        for angle in Sweep::new(start, target, self.config.motion.steps) {
            self.write_logical(joint, angle).await?;
            tokio::time::sleep(self.step_delay).await;
        }
        Ok(())
    }

    /// The single place where the logical to physical offset is applied.
    async fn write_logical(&mut self, joint: JointId, logical: f32) -> std::result::Result<(), DriverError> {
        let physical = (logical + self.config.offsets.get(joint)) as i32;
        self.driver.write_joint(joint, physical).await
    }
}

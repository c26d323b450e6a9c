use crate::arm_config::{ArmConfig, PlanarPosition};
use crate::kinematics::JointPair;

/// Snapshot of the logical joint angles and the end effector position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub shoulder: f32,
    pub elbow: f32,
    pub base: f32,
    pub wrist: f32,
    pub gripper: f32,
    pub position: PlanarPosition,
}

/// Authoritative joint state for the whole arm.
///
/// Created once at startup seeded to the calibrated home pose and mutated
/// only when a move has fully completed. `position` and the shoulder/elbow
/// pair are committed together so the pose always satisfies the forward
/// kinematics relation.
pub struct JointState {
    pose: Pose,
    config: ArmConfig,
}

impl JointState {
    pub fn new_home(config: ArmConfig) -> JointState {
        let home = &config.home;
        let pose = Pose {
            shoulder: home.shoulder,
            elbow: home.elbow,
            base: home.base,
            wrist: home.wrist,
            gripper: home.gripper,
            position: home.position,
        };
        JointState { pose, config }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The only mutator for the shoulder/elbow pair and the end effector
    /// position. Called exactly once per completed move, never while a
    /// move is still stepping.
    pub fn commit_arm(&mut self, joints: JointPair, position: PlanarPosition) {
        self.pose.shoulder = joints.shoulder;
        self.pose.elbow = joints.elbow;
        self.pose.position = position;
    }

    /// Clamps to the base range before storing; the clamp is silent and
    /// the stored value is returned.
    pub fn set_base(&mut self, angle: f32) -> f32 {
        self.pose.base = self.config.clamp_base(angle);
        self.pose.base
    }

    pub fn set_wrist(&mut self, angle: f32) -> f32 {
        self.pose.wrist = self.config.clamp_wrist(angle);
        self.pose.wrist
    }

    pub fn set_gripper(&mut self, angle: f32) -> f32 {
        self.pose.gripper = self.config.clamp_gripper(angle);
        self.pose.gripper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm_config::ArmConfig;
    use crate::kinematics;

    #[test]
    fn starts_at_home() {
        let config = ArmConfig::included();
        let state = JointState::new_home(config.clone());
        let pose = state.pose();
        assert_eq!(pose.shoulder, config.home.shoulder);
        assert_eq!(pose.elbow, config.home.elbow);
        assert_eq!(pose.position, config.home.position);
    }

    #[test]
    fn commit_updates_angles_and_position_together() {
        let config = ArmConfig::included();
        let mut state = JointState::new_home(config.clone());
        let target = PlanarPosition::new(12.0, 10.0);
        let joints = kinematics::solve(&config.geometry, target).unwrap();
        state.commit_arm(joints, target);
        let pose = state.pose();
        assert_eq!(pose.position, target);
        assert_eq!(pose.shoulder, joints.shoulder);
        assert_eq!(pose.elbow, joints.elbow);
    }

    #[test]
    fn setters_clamp_silently() {
        let config = ArmConfig::included();
        let mut state = JointState::new_home(config);
        assert_eq!(state.set_base(200.0), 135.0);
        assert_eq!(state.set_wrist(-20.0), 0.0);
        assert_eq!(state.set_gripper(150.0), 90.0);
        assert_eq!(state.set_gripper(-10.0), 0.0);
        assert_eq!(state.set_wrist(85.0), 85.0);
    }
}

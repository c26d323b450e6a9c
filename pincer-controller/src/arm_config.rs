use serde::{Deserialize, Serialize};
use std::{fmt, fs, str, time::Duration};
use thiserror::Error;

/// Margin in cm kept away from full extension/retraction to avoid the
/// singular poses at the edge of the annulus.
pub const REACH_MARGIN: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error while accessing configuration")]
    IoError(#[from] std::io::Error),
    #[error("error while parsing json")]
    JsonError(#[from] serde_json::error::Error),
    #[error("error while parsing yaml")]
    YamlError(#[from] serde_yaml::Error),
    #[error("motion.steps must be at least 1")]
    ZeroSteps,
}

type Result<T> = std::result::Result<T, ConfigError>;

/// The five joints of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointId {
    Base,
    Shoulder,
    Elbow,
    Wrist,
    Gripper,
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JointId::Base => "base",
            JointId::Shoulder => "shoulder",
            JointId::Elbow => "elbow",
            JointId::Wrist => "wrist",
            JointId::Gripper => "gripper",
        };
        write!(f, "{}", name)
    }
}

/// End effector position in the arm's sagittal plane.
///
/// `y` is horizontal distance from the base and `z` is height above
/// ground, both in cm. Base rotation is ignored by the planar model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPosition {
    pub y: f32,
    pub z: f32,
}

impl PlanarPosition {
    pub fn new(y: f32, z: f32) -> PlanarPosition {
        PlanarPosition { y, z }
    }
}

/// Link lengths and limits of the arm, all lengths in cm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ArmGeometry {
    /// Ground to shoulder pivot
    pub base_height: f32,
    /// Shoulder to elbow
    pub upper_arm: f32,
    /// Elbow to end effector
    pub forearm: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
    pub servo_min: f32,
    pub servo_max: f32,
}

impl ArmGeometry {
    pub fn max_reach(&self) -> f32 {
        self.upper_arm + self.forearm - REACH_MARGIN
    }

    pub fn min_reach(&self) -> f32 {
        (self.upper_arm - self.forearm).abs() + REACH_MARGIN
    }

    pub fn within_servo_limits(&self, angle: f32) -> bool {
        angle >= self.servo_min && angle <= self.servo_max
    }
}

/// Per joint corrections converting logical (IK facing) angles to the
/// physical servo angles. `physical = logical + offset`, applied exactly
/// once at the driver write boundary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct JointOffsets {
    pub base: f32,
    pub shoulder: f32,
    pub elbow: f32,
    pub wrist: f32,
    pub gripper: f32,
}

impl JointOffsets {
    pub fn get(&self, joint: JointId) -> f32 {
        match joint {
            JointId::Base => self.base,
            JointId::Shoulder => self.shoulder,
            JointId::Elbow => self.elbow,
            JointId::Wrist => self.wrist,
            JointId::Gripper => self.gripper,
        }
    }
}

/// Named gripper positions in logical degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GripperRange {
    pub open: f32,
    pub calm: f32,
    pub tight: f32,
}

/// Calibrated resting pose. The end effector position was measured at
/// these joint angles rather than derived from the solver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct HomePose {
    pub shoulder: f32,
    pub elbow: f32,
    pub base: f32,
    pub wrist: f32,
    pub gripper: f32,
    pub position: PlanarPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    /// Interpolation steps per move
    pub steps: u32,
    /// Blocking delay between steps
    pub step_delay_ms: u64,
}

impl MotionSettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Servo controller output channel per joint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ServoChannels {
    pub base: u8,
    pub shoulder: u8,
    pub elbow: u8,
    pub wrist: u8,
    pub gripper: u8,
}

impl ServoChannels {
    pub fn get(&self, joint: JointId) -> u8 {
        match joint {
            JointId::Base => self.base,
            JointId::Shoulder => self.shoulder,
            JointId::Elbow => self.elbow,
            JointId::Wrist => self.wrist,
            JointId::Gripper => self.gripper,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArmConfig {
    pub geometry: ArmGeometry,
    pub offsets: JointOffsets,
    pub gripper: GripperRange,
    pub home: HomePose,
    pub motion: MotionSettings,
    pub channels: ServoChannels,
}

impl ArmConfig {
    /// Pincer comes with an included config file.
    ///
    /// This file is packaged with the binary
    /// This method retrieves this included version
    pub fn included() -> ArmConfig {
        let json = str::from_utf8(include_bytes!("../config/pincer.json")).unwrap();
        ArmConfig::parse_json(json).unwrap()
    }

    pub fn parse_json(text: &str) -> Result<ArmConfig> {
        let config: ArmConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_yaml(text: &str) -> Result<ArmConfig> {
        let config: ArmConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// A zero step sweep would write nothing to the servos while still
    /// committing the target pose, so such configs are rejected up front.
    fn validate(&self) -> Result<()> {
        if self.motion.steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        Ok(())
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    pub fn serialize_to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        fs::write(path, self.serialize_to_json()?)?;
        Ok(())
    }

    pub fn save_yaml(&self, path: &str) -> Result<()> {
        fs::write(path, self.serialize_to_yaml()?)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<ArmConfig> {
        let text = fs::read_to_string(path)?;
        let config = ArmConfig::parse_json(&text)?;
        Ok(config)
    }

    pub fn load_yaml(path: &str) -> Result<ArmConfig> {
        let text = fs::read_to_string(path)?;
        let config = ArmConfig::parse_yaml(&text)?;
        Ok(config)
    }

    /// Silent workspace clamp applied to absolute targets before the
    /// solver runs. Distinct from the hard reachability failure, which
    /// can still trigger on the clamped point.
    pub fn clamp_to_workspace(&self, target: PlanarPosition) -> PlanarPosition {
        PlanarPosition {
            y: target.y.clamp(self.geometry.y_min, self.geometry.y_max),
            z: target.z.clamp(self.geometry.z_min, self.geometry.z_max),
        }
    }

    /// Base range leaves headroom for the base offset so the physical
    /// angle never exceeds the servo maximum.
    pub fn clamp_base(&self, angle: f32) -> f32 {
        angle.clamp(
            self.geometry.servo_min,
            self.geometry.servo_max - self.offsets.base,
        )
    }

    pub fn clamp_wrist(&self, angle: f32) -> f32 {
        angle.clamp(
            self.geometry.servo_min,
            self.geometry.servo_max - self.offsets.wrist,
        )
    }

    pub fn clamp_gripper(&self, angle: f32) -> f32 {
        angle.clamp(self.gripper.tight, self.gripper.open)
    }
}

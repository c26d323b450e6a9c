use crate::arm_config::{ArmConfig, JointId};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("error while accessing the servo device")]
    IoError(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, DriverError>;

/// Seam to the actuator hardware.
///
/// The write is fire and forget: there is no acknowledgment from the
/// servos and no position feedback. Angles arrive as physical degrees
/// with the joint offset already applied.
#[async_trait]
pub trait ArmDriver: Send + Sync {
    async fn write_joint(&mut self, joint: JointId, physical_angle: i32) -> Result<()>;
}

/// Drives an SSC-32 style servo controller over a serial character
/// device. One `#<channel>P<pulse>\r` line per joint write.
pub struct SerialArmDriver {
    port: fs::File,
    config: ArmConfig,
}

impl SerialArmDriver {
    pub async fn new(port: &str, config: ArmConfig) -> Result<Box<Self>> {
        let port = fs::OpenOptions::new().write(true).open(port).await?;
        Ok(Box::new(SerialArmDriver { port, config }))
    }
}

#[async_trait]
impl ArmDriver for SerialArmDriver {
    async fn write_joint(&mut self, joint: JointId, physical_angle: i32) -> Result<()> {
        let channel = self.config.channels.get(joint);
        let command = format!("#{}P{}\r", channel, pulse_width(physical_angle));
        self.port.write_all(command.as_bytes()).await?;
        self.port.flush().await?;
        Ok(())
    }
}

/// Dry run driver for running without hardware attached. Writes only show
/// up in the trace output.
pub struct SinkDriver;

#[async_trait]
impl ArmDriver for SinkDriver {
    async fn write_joint(&mut self, joint: JointId, physical_angle: i32) -> Result<()> {
        tracing::debug!(%joint, physical_angle, "servo write");
        Ok(())
    }
}

/// Captures every write for inspection. Intended for tests.
#[derive(Default, Clone)]
pub struct RecordingDriver {
    writes: Arc<Mutex<Vec<(JointId, i32)>>>,
}

impl RecordingDriver {
    pub fn new() -> RecordingDriver {
        RecordingDriver::default()
    }

    pub fn writes(&self) -> Vec<(JointId, i32)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_for(&self, joint: JointId) -> Vec<i32> {
        self.writes()
            .into_iter()
            .filter(|(id, _)| *id == joint)
            .map(|(_, angle)| angle)
            .collect()
    }
}

#[async_trait]
impl ArmDriver for RecordingDriver {
    async fn write_joint(&mut self, joint: JointId, physical_angle: i32) -> Result<()> {
        self.writes.lock().unwrap().push((joint, physical_angle));
        Ok(())
    }
}

/// Standard hobby servo pulse width, 500-2500µs over the 0-180° range.
fn pulse_width(physical_angle: i32) -> u32 {
    let angle = physical_angle.clamp(0, 180) as u32;
    500 + angle * 2000 / 180
}

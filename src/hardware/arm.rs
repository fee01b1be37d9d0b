use crate::error::{HackerbotError, Result};
use crate::vision::geometry::JointVector;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Arm connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmConfig {
    /// Serial device of the main controller, or `dry-run`
    pub device: String,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            device: std::env::var("HACKERBOT_ARM").unwrap_or_else(|_| "dry-run".to_string()),
        }
    }
}

/// Actuator accepting absolute joint positions.
#[async_trait]
pub trait ArmController: Send + Sync {
    async fn move_joints(&self, joints: &JointVector, speed: u32) -> Result<()>;
}

/// Build the controller named by `config.device`.
pub fn open_arm(config: &ArmConfig) -> Arc<dyn ArmController> {
    match config.device.trim() {
        "dry-run" | "" => Arc::new(DryRunArm::new()),
        path => Arc::new(SerialArm::new(path)),
    }
}

/// Main-controller serial link.
///
/// Every move opens the device, writes one `A_ANGLES` line and closes it again without a
/// dock command, so no connection state survives between moves. Line settings (baud rate)
/// are expected to be configured on the device beforehand.
pub struct SerialArm {
    path: PathBuf,
}

impl SerialArm {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// `A_ANGLES,j1,j2,j3,j4,j5,j6,speed`
pub fn angles_command(joints: &JointVector, speed: u32) -> String {
    let angles: Vec<String> = joints.angles().iter().map(|a| format!("{:.1}", a)).collect();
    format!("A_ANGLES,{},{}\n", angles.join(","), speed)
}

#[async_trait]
impl ArmController for SerialArm {
    async fn move_joints(&self, joints: &JointVector, speed: u32) -> Result<()> {
        info!(device = %self.path.display(), joints = %joints, speed, "Moving the arm");

        let arm_error = |action: &str, e: std::io::Error| {
            HackerbotError::ArmError(format!("{} {}: {}", action, self.path.display(), e))
        };

        let mut port = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| arm_error("open", e))?;

        port.write_all(angles_command(joints, speed).as_bytes())
            .await
            .map_err(|e| arm_error("write to", e))?;
        port.flush().await.map_err(|e| arm_error("flush", e))?;

        Ok(())
    }
}

/// Logs and records moves instead of driving hardware.
#[derive(Default)]
pub struct DryRunArm {
    moves: Mutex<Vec<(JointVector, u32)>>,
}

impl DryRunArm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every move issued so far, oldest first
    pub fn moves(&self) -> Vec<(JointVector, u32)> {
        self.moves.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ArmController for DryRunArm {
    async fn move_joints(&self, joints: &JointVector, speed: u32) -> Result<()> {
        info!(joints = %joints, speed, "Moving the arm (dry run)");
        self.moves
            .lock()
            .map_err(|_| HackerbotError::ArmError("dry-run log poisoned".to_string()))?
            .push((*joints, speed));
        Ok(())
    }
}

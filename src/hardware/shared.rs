//! Camera and arm shared by every chat session.
//!
//! There is one physical camera and one physical arm. Each is behind its own async mutex so
//! concurrent sessions take turns: a capture holds the camera guard for the whole blocking
//! read, an arm move holds the arm guard until the command is written.

use crate::error::{HackerbotError, Result};
use crate::hardware::arm::ArmController;
use crate::hardware::camera::FrameSource;
use crate::vision::frame::Frame;
use crate::vision::geometry::JointVector;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct SharedHardware {
    camera: Arc<dyn FrameSource>,
    camera_guard: Mutex<()>,
    arm: Option<Arc<dyn ArmController>>,
    arm_guard: Mutex<()>,
}

impl SharedHardware {
    pub fn new(camera: Arc<dyn FrameSource>, arm: Option<Arc<dyn ArmController>>) -> Self {
        Self {
            camera,
            camera_guard: Mutex::new(()),
            arm,
            arm_guard: Mutex::new(()),
        }
    }

    pub fn has_arm(&self) -> bool {
        self.arm.is_some()
    }

    /// Grab one frame, waiting for any other session's capture to finish first.
    pub async fn capture(&self) -> Result<Frame> {
        let _guard = self.camera_guard.lock().await;
        debug!(source = %self.camera.describe(), "Camera acquired");

        let camera = Arc::clone(&self.camera);
        tokio::task::spawn_blocking(move || camera.capture())
            .await
            .map_err(|e| HackerbotError::DeviceError(format!("capture task failed: {}", e)))?
    }

    /// Command an absolute joint position, waiting for any other session's move first.
    pub async fn move_arm(&self, joints: &JointVector, speed: u32) -> Result<()> {
        let arm = self
            .arm
            .as_ref()
            .ok_or_else(|| HackerbotError::ArmError("no arm configured".to_string()))?;

        let _guard = self.arm_guard.lock().await;
        debug!("Arm acquired");
        arm.move_joints(joints, speed).await
    }
}

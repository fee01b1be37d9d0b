//! Per-connection interaction state.
//!
//! A [`Session`] holds the current [`InteractionMode`] and the last commanded joint vector.
//! The mode only changes when the user picks an action; processing a message reads it but
//! never resets it.

use crate::error::{HackerbotError, Result};
use crate::vision::geometry::JointVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Prompt is the user's message verbatim
    #[default]
    Chat,
    /// Ask for a bounding box and annotate the frame
    Locate,
    /// Locate, then pan/tilt the arm onto the object
    Center,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 3] =
        [InteractionMode::Chat, InteractionMode::Locate, InteractionMode::Center];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Chat => "chat",
            InteractionMode::Locate => "locate",
            InteractionMode::Center => "center",
        }
    }

    /// Name of the action that selects this mode
    pub fn action_name(&self) -> &'static str {
        match self {
            InteractionMode::Chat => "action_chat",
            InteractionMode::Locate => "action_locate",
            InteractionMode::Center => "action_center",
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            InteractionMode::Chat => "Chat about the arm view",
            InteractionMode::Locate => "Locate an object within the arm view",
            InteractionMode::Center => "Center the arm on an object",
        }
    }

    /// Reply sent after the mode is selected
    pub fn acknowledgement(&self) -> &'static str {
        match self {
            InteractionMode::Chat => "Enter your query:",
            InteractionMode::Locate => "Enter the object to locate:",
            InteractionMode::Center => "Enter the object to center on:",
        }
    }

    pub fn from_action(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.action_name() == name)
    }

    /// Whether the model is asked for a bounding box in this mode
    pub fn locates(&self) -> bool {
        matches!(self, InteractionMode::Locate | InteractionMode::Center)
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = HackerbotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HackerbotError::InvalidMode(s.to_string()))
    }
}

/// State of one chat connection. Dropped when the connection ends.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    mode: InteractionMode,
    joints: JointVector,
    offered: Vec<InteractionMode>,
}

impl Session {
    /// New session in chat mode with the arm assumed at home.
    pub fn new(offered: &[InteractionMode]) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: InteractionMode::Chat,
            joints: JointVector::zero(),
            offered: offered.to_vec(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn joints(&self) -> JointVector {
        self.joints
    }

    pub fn offered_modes(&self) -> &[InteractionMode] {
        &self.offered
    }

    /// Switch mode; only modes this session offers can be selected.
    pub fn select(&mut self, mode: InteractionMode) -> Result<()> {
        if !self.offered.contains(&mode) {
            return Err(HackerbotError::InvalidMode(mode.to_string()));
        }
        self.mode = mode;
        Ok(())
    }

    /// Switch mode by action name (`action_chat`, `action_locate`, `action_center`).
    pub fn select_action(&mut self, action: &str) -> Result<InteractionMode> {
        let mode = InteractionMode::from_action(action)
            .ok_or_else(|| HackerbotError::InvalidMode(action.to_string()))?;
        self.select(mode)?;
        Ok(mode)
    }

    /// Replace the recorded joint vector after a successful move.
    pub fn set_joints(&mut self, joints: JointVector) {
        self.joints = joints;
    }
}

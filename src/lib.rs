pub mod assistant;
pub mod config;
pub mod error;
pub mod hardware;
pub mod llm;
pub mod mcp;
pub mod session;
pub mod vision;

pub use error::{HackerbotError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assistant::{Assistant, ChatSurface, OutboundMessage, TerminalSurface};
    pub use crate::config::{AssistantConfig, Provider, VariantProfile};
    pub use crate::error::{HackerbotError, Result};
    pub use crate::hardware::{FrameSource, SharedHardware};
    pub use crate::llm::gateways::{GeminiGateway, OllamaGateway};
    pub use crate::llm::{LlmBroker, LlmGateway, LlmMessage};
    pub use crate::mcp::HackerbotMcp;
    pub use crate::session::{InteractionMode, Session};
    pub use crate::vision::{BoundingBox, CameraModel, Frame, JointVector};
}

use crate::error::Result;
use crate::llm::models::ImageData;
use crate::session::InteractionMode;
use async_trait::async_trait;

/// Selectable button offered alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub label: String,
}

impl From<InteractionMode> for Action {
    fn from(mode: InteractionMode) -> Self {
        Self {
            name: mode.action_name().to_string(),
            label: mode.action_label().to_string(),
        }
    }
}

/// Image shown inline with a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub image: ImageData,
}

/// One message rendered to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    pub image: Option<Attachment>,
    pub actions: Vec<Action>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            actions: Vec::new(),
        }
    }

    /// Message whose text is the image caption.
    pub fn image(name: impl Into<String>, image: ImageData) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            image: Some(Attachment { name, image }),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Rendering side of a chat front end.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<()>;
}

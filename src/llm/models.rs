use base64::Engine;
use serde::{Deserialize, Serialize};

/// Message role in LLM conversation
///
/// Vision queries are single user turns carrying the frame and the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

/// Encoded image attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// JPEG image, the format frames are sent in
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "image/jpeg")
    }

    /// Standard base64 of the raw bytes
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Message in LLM conversation
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: Option<String>,
    pub images: Vec<ImageData>,
}

/// Response from LLM gateway
#[derive(Debug, Clone, Default)]
pub struct LlmGatewayResponse {
    pub content: Option<String>,
}

impl LlmMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            images: Vec::new(),
        }
    }

    /// Attach an image to this message
    pub fn with_image(mut self, image: ImageData) -> Self {
        self.images.push(image);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_user_message() {
        let msg = LlmMessage::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, Some("Hello".to_string()));
        assert!(msg.images.is_empty());
    }

    #[test]
    fn test_message_with_image() {
        let msg =
            LlmMessage::user("What do you see?").with_image(ImageData::jpeg(vec![0xFF, 0xD8]));
        assert_eq!(msg.images.len(), 1);
        assert_eq!(msg.images[0].mime_type, "image/jpeg");
        assert_eq!(msg.images[0].bytes, vec![0xFF, 0xD8]);
    }

    #[test]
    fn test_image_base64() {
        let image = ImageData::new(b"hello".to_vec(), "image/png");
        assert_eq!(image.to_base64(), "aGVsbG8=");
    }
}

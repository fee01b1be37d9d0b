//! Gemini gateway for vision queries.
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`). Images are
//! sent as inline base64 parts ahead of the text part, which is the order the model is
//! prompted with in every interaction mode.

use crate::error::{HackerbotError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for connecting to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("GEMINI_API_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_GEMINI_ENDPOINT.to_string()),
            timeout: None,
        }
    }
}

/// Gateway for Google's Gemini models.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Create a gateway from the environment.
    ///
    /// Fails when `GEMINI_API_KEY` is absent; the assistant cannot start without it.
    pub fn new() -> Result<Self> {
        Self::with_config(GeminiConfig::default())
    }

    /// Create a new Gemini gateway with custom configuration.
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(HackerbotError::ConfigError("GEMINI_API_KEY is not set".to_string()));
        }

        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(GeminiConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Gemini for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = json!({
            "contents": adapt_messages_to_gemini(messages),
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_tokens,
            }
        });

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.config.base_url, model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(HackerbotError::GatewayError(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;

        Ok(LlmGatewayResponse {
            content: extract_text(&response_body),
        })
    }
}

fn adapt_messages_to_gemini(messages: &[LlmMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            let mut parts: Vec<Value> = msg
                .images
                .iter()
                .map(|image| {
                    json!({
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": image.to_base64(),
                        }
                    })
                })
                .collect();

            if let Some(content) = &msg.content {
                parts.push(json!({ "text": content }));
            }

            json!({ "role": msg.role, "parts": parts })
        })
        .collect()
}

// Concatenate the text parts of the first candidate
fn extract_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

    if text.is_empty() {
        if let Some(reason) = body["candidates"][0]["finishReason"].as_str() {
            warn!(finish_reason = reason, "Gemini returned no text");
        }
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::ImageData;

    fn gateway_for(server: &mockito::Server) -> GeminiGateway {
        GeminiGateway::with_api_key_and_base_url("test-key", server.url()).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = GeminiGateway::with_config(GeminiConfig {
            api_key: "  ".to_string(),
            base_url: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: None,
        });

        assert!(matches!(result, Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_adapt_messages_puts_image_before_text() {
        let messages =
            vec![LlmMessage::user("Describe this").with_image(ImageData::jpeg(b"abc".to_vec()))];

        let result = adapt_messages_to_gemini(&messages);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["role"], "user");
        assert_eq!(result[0]["parts"][0]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(result[0]["parts"][0]["inline_data"]["data"], "YWJj");
        assert_eq!(result[0]["parts"][1]["text"], "Describe this");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Thinking... "}, {"text": "BOUNDING BOX: null"}]}
            }]
        });

        assert_eq!(extract_text(&body), Some("Thinking... BOUNDING BOX: null".to_string()));
    }

    #[test]
    fn test_extract_text_missing_candidates() {
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }

    #[tokio::test]
    async fn test_complete_simple() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"A mug."}]}}]}"#,
            )
            .create_async()
            .await;

        let gateway = gateway_for(&server);
        let messages = vec![LlmMessage::user("What is this?").with_image(ImageData::jpeg(vec![1]))];

        let result = gateway.complete("gemini-test", &messages, &CompletionConfig::default()).await;

        mock.assert_async().await;
        assert_eq!(result.unwrap().content, Some("A mug.".to_string()));
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(403)
            .with_body("permission denied")
            .create_async()
            .await;

        let gateway = gateway_for(&server);
        let result = gateway
            .complete("gemini-test", &[LlmMessage::user("Hi")], &CompletionConfig::default())
            .await;

        mock.assert_async().await;
        match result {
            Err(HackerbotError::GatewayError(msg)) => assert!(msg.contains("permission denied")),
            other => panic!("Expected GatewayError, got {:?}", other.map(|r| r.content)),
        }
    }
}

use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{ImageData, LlmMessage};
use std::sync::Arc;
use tracing::{debug, info};

/// Main interface for vision model queries
///
/// The broker pins a model identifier to a gateway. The identifier is opaque here; each
/// gateway decides how to address it.
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    /// The model identifier requests are sent to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text response from LLM
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();

        debug!(model = %self.model, messages = messages.len(), "Generating response");
        let response = self.gateway.complete(&self.model, messages, &config).await?;

        Ok(response.content.unwrap_or_default())
    }

    /// Send one image with a text prompt and return the model's free-form answer
    pub async fn ask_about_image(&self, image: ImageData, prompt: &str) -> Result<String> {
        info!(
            model = %self.model,
            image_bytes = image.bytes.len(),
            mime_type = %image.mime_type,
            "Querying vision model"
        );
        let message = LlmMessage::user(prompt).with_image(image);
        self.generate(&[message], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HackerbotError;
    use crate::llm::models::LlmGatewayResponse;
    use std::sync::Mutex;

    // Mock gateway for testing
    struct MockGateway {
        response: Option<String>,
        seen: Mutex<Vec<LlmMessage>>,
    }

    impl MockGateway {
        fn new(response: Option<&str>) -> Self {
            Self {
                response: response.map(String::from),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            model: &str,
            messages: &[LlmMessage],
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            if model == "broken" {
                return Err(HackerbotError::GatewayError("quota exceeded".to_string()));
            }
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(LlmGatewayResponse {
                content: self.response.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_broker_new() {
        let gateway = Arc::new(MockGateway::new(None));
        let broker = LlmBroker::new("test-model", gateway);
        assert_eq!(broker.model(), "test-model");
    }

    #[tokio::test]
    async fn test_generate_simple_response() {
        let gateway = Arc::new(MockGateway::new(Some("A red cup on a desk.")));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("What do you see?")];
        let result = broker.generate(&messages, None).await.unwrap();

        assert_eq!(result, "A red cup on a desk.");
    }

    #[tokio::test]
    async fn test_generate_empty_content() {
        let gateway = Arc::new(MockGateway::new(None));
        let broker = LlmBroker::new("test-model", gateway);

        let result = broker.generate(&[LlmMessage::user("Hi")], None).await.unwrap();

        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_ask_about_image_attaches_image() {
        let gateway = Arc::new(MockGateway::new(Some("BOUNDING BOX: null")));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let result = broker
            .ask_about_image(ImageData::jpeg(vec![1, 2, 3]), "Find the cup")
            .await
            .unwrap();

        assert_eq!(result, "BOUNDING BOX: null");
        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].content.as_deref(), Some("Find the cup"));
        assert_eq!(seen[0].images, vec![ImageData::jpeg(vec![1, 2, 3])]);
    }

    #[tokio::test]
    async fn test_gateway_error_propagates() {
        let gateway = Arc::new(MockGateway::new(Some("unused")));
        let broker = LlmBroker::new("broken", gateway);

        let result = broker.generate(&[LlmMessage::user("Hi")], None).await;

        assert!(matches!(result, Err(HackerbotError::GatewayError(_))));
    }
}

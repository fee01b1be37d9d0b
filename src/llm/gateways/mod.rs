pub mod gemini;
pub mod ollama;

pub use gemini::{GeminiConfig, GeminiGateway};
pub use ollama::{OllamaConfig, OllamaGateway};

//! LLM provider trait for chat-style generation

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// One turn of a chat conversation sent to the model
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for LLM chat completion
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a chat completion with a system prompt and conversation turns
    async fn chat(&self, system: &str, turns: &[ChatTurn]) -> Result<String>;

    /// Single-prompt completion, no conversation history
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(system, &[ChatTurn::user(prompt)]).await
    }

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

use async_trait::async_trait;

use crate::clients::openai_client::{self, ChatMessage, ToolSpec};

/// Seam over the chat-completions API so the agent loop can run against a
/// scripted double in tests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct OpenAIService {
    api_key: String,
    model: String,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String) -> Self {
        Self { api_key, model }
    }
}

#[async_trait]
impl ChatClient for OpenAIService {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, Box<dyn std::error::Error + Send + Sync>> {
        openai_client::chat_completion(&self.api_key, &self.model, messages, tools).await
    }
}

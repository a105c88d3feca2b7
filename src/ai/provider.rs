use async_trait::async_trait;

use crate::ai::message::ChatMessage;
use crate::error::AppError;

/// Token usage from an AI provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A completed, non-streaming model reply.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Send messages and get a complete response.
    /// If `max_tokens` is `Some(n)`, cap the response length; otherwise use the provider default.
    ///
    /// Implementations return `MalformedUpstreamResponse` when the reply carries no text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: Option<u32>,
    ) -> Result<Completion, AppError>;
}

//! Completion client trait

use async_trait::async_trait;

use crate::{ChatMessage, Completion, CompletionConfig, LlmResult};

/// Stateless request/response text generation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider name for logs.
    fn provider(&self) -> &str;

    /// Generate a reply to `messages` under `config`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> LlmResult<Completion>;
}

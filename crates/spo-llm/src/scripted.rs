//! Offline completion client driven by a closure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ChatMessage, Completion, CompletionClient, CompletionConfig, LlmResult};

type Responder =
    dyn Fn(&[ChatMessage], &CompletionConfig) -> LlmResult<Completion> + Send + Sync + 'static;

/// Closure-backed client for tests and offline dry runs. Never touches the network.
#[derive(Clone)]
pub struct ScriptedClient {
    responder: Arc<Responder>,
    calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage], &CompletionConfig) -> LlmResult<Completion> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always reply with the same text.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(Completion::text(text.clone())))
    }

    /// Reply with the last user message, for offline dry runs.
    pub fn echo() -> Self {
        Self::new(|messages, _| {
            let last = messages
                .iter()
                .rev()
                .find(|m| m.role == crate::Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(Completion::text(last))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> LlmResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(messages, config)
    }
}

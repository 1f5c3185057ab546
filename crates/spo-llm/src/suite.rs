//! Per-role model selection over one shared client.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, CompletionClient, CompletionConfig, LlmResult, UsageSummary, UsageTracker};

/// Which stage of the loop a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Candidate generation.
    Optimize,
    /// Judged comparison trials.
    Evaluate,
    /// Running a candidate prompt against questions.
    Execute,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestKind::Optimize => "optimize",
            RequestKind::Evaluate => "evaluate",
            RequestKind::Execute => "execute",
        };
        write!(f, "{}", name)
    }
}

/// The completion capability as seen by the optimizer: one client, one config
/// per request kind, and shared usage totals.
pub struct ModelSuite {
    client: Arc<dyn CompletionClient>,
    optimize: CompletionConfig,
    evaluate: CompletionConfig,
    execute: CompletionConfig,
    usage: UsageTracker,
}

impl std::fmt::Debug for ModelSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSuite")
            .field("provider", &self.client.provider())
            .field("optimize", &self.optimize)
            .field("evaluate", &self.evaluate)
            .field("execute", &self.execute)
            .finish()
    }
}

impl ModelSuite {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        optimize: CompletionConfig,
        evaluate: CompletionConfig,
        execute: CompletionConfig,
    ) -> Self {
        Self {
            client,
            optimize,
            evaluate,
            execute,
            usage: UsageTracker::new(),
        }
    }

    /// Same config for every request kind.
    pub fn uniform(client: Arc<dyn CompletionClient>, config: CompletionConfig) -> Self {
        Self::new(client, config.clone(), config.clone(), config)
    }

    pub fn config(&self, kind: RequestKind) -> &CompletionConfig {
        match kind {
            RequestKind::Optimize => &self.optimize,
            RequestKind::Evaluate => &self.evaluate,
            RequestKind::Execute => &self.execute,
        }
    }

    /// Send `messages` with the config for `kind` and return the reply text.
    pub async fn respond(&self, kind: RequestKind, messages: &[ChatMessage]) -> LlmResult<String> {
        let config = self.config(kind);
        let completion = self.client.complete(messages, config).await?;

        let record = self
            .usage
            .add(&config.model, completion.input_tokens, completion.output_tokens);
        tracing::debug!(
            kind = %kind,
            model = %config.model,
            tokens = record.total_tokens(),
            cost = record.total_cost(),
            "Token usage"
        );

        Ok(completion.text)
    }

    pub fn usage(&self) -> UsageSummary {
        self.usage.summary()
    }
}

//! Execution stage: answer every sampled question with one prompt.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use spo_llm::{ChatMessage, ModelSuite, RequestKind};
use spo_types::QaPair;

use crate::config::DEFAULT_MAX_CONCURRENCY;

/// Runs a prompt against a batch of questions.
#[derive(Debug, Clone)]
pub struct Executor {
    models: Arc<ModelSuite>,
    max_concurrency: usize,
}

impl Executor {
    pub fn new(models: Arc<ModelSuite>) -> Self {
        Self {
            models,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Answer every question with `prompt`.
    ///
    /// The result has one pair per question, in input order. A failed request
    /// does not fail the batch; its error text becomes the answer.
    pub async fn execute(&self, prompt: &str, questions: &[String]) -> Vec<QaPair> {
        stream::iter(questions)
            .map(|question| self.answer(prompt, question))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn answer(&self, prompt: &str, question: &str) -> QaPair {
        let messages = [ChatMessage::user(format!("{}\n\n{}", prompt, question))];

        let answer = match self.models.respond(RequestKind::Execute, &messages).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "Execution request failed");
                err.to_string()
            }
        };

        QaPair::new(question, answer)
    }
}

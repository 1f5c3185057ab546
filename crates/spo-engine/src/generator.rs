//! Candidate generator.
//!
//! Asks the optimize model to rewrite the current best prompt and pulls the
//! new prompt out of its tagged reply.

use std::sync::Arc;

use spo_llm::{ChatMessage, LlmResult, ModelSuite, RequestKind};
use spo_types::{length_clause, render_markdown, QaPair};

use crate::parse::extract_tag;
use crate::prompts::optimize_prompt;

/// A rewritten prompt and the optimizer's one-line summary of the change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Proposal {
    /// Empty when the reply carried no `<prompt>` block.
    pub prompt: String,
    pub modification: Option<String>,
}

impl Proposal {
    /// Parse an optimizer reply.
    pub fn from_reply(reply: &str) -> Self {
        Self {
            prompt: extract_tag(reply, "prompt").unwrap_or_default().to_string(),
            modification: extract_tag(reply, "modification").map(str::to_string),
        }
    }
}

/// Produces one new candidate prompt per call from the current best.
#[derive(Debug, Clone)]
pub struct Generator {
    models: Arc<ModelSuite>,
}

impl Generator {
    pub fn new(models: Arc<ModelSuite>) -> Self {
        Self { models }
    }

    /// Ask the optimize model for a rewrite of `best_prompt`.
    ///
    /// Only a failed request is an error. A reply without a `<prompt>` block
    /// yields an empty prompt, which is executed and judged like any other.
    pub async fn propose(
        &self,
        best_prompt: &str,
        best_answers: &[QaPair],
        requirements: &str,
        gold: &[QaPair],
        target_length: Option<u32>,
    ) -> LlmResult<Proposal> {
        let request = optimize_prompt(
            requirements,
            best_prompt,
            &render_markdown(best_answers),
            &render_markdown(gold),
            &length_clause(target_length),
        );

        let reply = self
            .models
            .respond(RequestKind::Optimize, &[ChatMessage::user(request)])
            .await?;

        let proposal = Proposal::from_reply(&reply);
        if proposal.prompt.is_empty() {
            tracing::warn!("Optimizer reply has no <prompt> block");
        }
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spo_llm::{Completion, CompletionConfig, LlmError, ScriptedClient};

    fn suite(client: ScriptedClient) -> Arc<ModelSuite> {
        Arc::new(ModelSuite::uniform(
            Arc::new(client),
            CompletionConfig::new("opt", 0.7),
        ))
    }

    #[tokio::test]
    async fn parses_prompt_and_modification() {
        let client = ScriptedClient::constant(
            "<analyse>too long</analyse><modification>Cap the length.</modification><prompt>Write a haiku.</prompt>",
        );
        let generator = Generator::new(suite(client));

        let proposal = generator
            .propose("Write a poem.", &[], "short", &[], None)
            .await
            .unwrap();
        assert_eq!(proposal.prompt, "Write a haiku.");
        assert_eq!(proposal.modification.as_deref(), Some("Cap the length."));
    }

    #[tokio::test]
    async fn request_embeds_inputs() {
        let client = ScriptedClient::new(|messages, config| {
            assert_eq!(config.model, "opt");
            let body = &messages[0].content;
            assert!(body.contains("Write a poem."));
            assert!(body.contains("Question 1\n\nmoon?"));
            assert!(body.contains("Answer 1\n\nsilver"));
            assert!(body.contains(", within 20 words"));
            Ok(Completion::text("<prompt>ok</prompt>"))
        });
        let generator = Generator::new(suite(client));

        let proposal = generator
            .propose(
                "Write a poem.",
                &[QaPair::new("moon?", "bright")],
                "rhymes",
                &[QaPair::new("moon?", "silver")],
                Some(20),
            )
            .await
            .unwrap();
        assert_eq!(proposal.prompt, "ok");
    }

    #[tokio::test]
    async fn missing_prompt_tag_gives_empty_prompt() {
        let generator = Generator::new(suite(ScriptedClient::constant("I would not change it.")));
        let proposal = generator.propose("p", &[], "r", &[], None).await.unwrap();
        assert_eq!(proposal, Proposal::default());
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let client = ScriptedClient::new(|_, _| Err(LlmError::Transport("refused".to_string())));
        let generator = Generator::new(suite(client));
        assert!(generator.propose("p", &[], "r", &[], None).await.is_err());
    }
}

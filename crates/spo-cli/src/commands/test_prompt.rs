//! Test-prompt command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use rand::thread_rng;
use spo_engine::{Executor, SpoConfig};
use spo_llm::{CompletionConfig, ModelSuite};
use spo_types::Template;

use super::completion_client;
use crate::error::{CliError, CliResult};

#[derive(Debug, Args)]
pub struct TestPromptArgs {
    /// Prompt to run
    #[arg(long)]
    pub prompt: String,

    /// Question to answer; repeat for several
    #[arg(long = "question")]
    pub questions: Vec<String>,

    /// Also answer a sample of this template's questions
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Execution model (defaults to the configured execute model)
    #[arg(long)]
    pub model: Option<String>,

    /// Execution temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Use a local echo client instead of the provider
    #[arg(long)]
    pub dry_run: bool,
}

impl TestPromptArgs {
    fn execute_config(&self, config: &SpoConfig) -> CompletionConfig {
        let mut execute = config.models.execute.clone();
        if let Some(model) = &self.model {
            execute.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            execute.temperature = temperature;
        }
        execute
    }

    fn collect_questions(&self, sample_k: usize) -> CliResult<Vec<String>> {
        let mut questions = self.questions.clone();
        if let Some(path) = &self.template {
            let template = Template::load(path)?;
            questions.extend(
                template
                    .sample_gold(sample_k, &mut thread_rng())
                    .into_iter()
                    .map(|pair| pair.question),
            );
        }
        if questions.is_empty() {
            return Err(CliError::InvalidInput(
                "give at least one --question or a --template".to_string(),
            ));
        }
        Ok(questions)
    }
}

pub async fn run(config_path: Option<&Path>, args: TestPromptArgs) -> CliResult<()> {
    let config = SpoConfig::load(config_path)?;
    let questions = args.collect_questions(config.search.sample_k)?;

    let client = completion_client(&config, args.dry_run)?;
    let models = Arc::new(ModelSuite::uniform(client, args.execute_config(&config)));
    let executor =
        Executor::new(models.clone()).with_max_concurrency(config.search.max_concurrency);

    for pair in executor.execute(&args.prompt, &questions).await {
        println!("Question:\n{}\nAnswer:\n{}\n", pair.question, pair.answer);
    }
    println!("Usage: {}", models.usage());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TestPromptArgs {
        TestPromptArgs {
            prompt: "Be brief.".to_string(),
            questions: vec![],
            template: None,
            model: None,
            temperature: None,
            dry_run: true,
        }
    }

    #[test]
    fn needs_some_question() {
        assert!(matches!(args().collect_questions(3), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn overrides_execute_model() {
        let config = SpoConfig::default();
        let args = TestPromptArgs {
            model: Some("gpt-4.1-nano".to_string()),
            temperature: Some(0.5),
            ..args()
        };
        let execute = args.execute_config(&config);
        assert_eq!(execute.model, "gpt-4.1-nano");
        assert_eq!(execute.temperature, 0.5);
    }

    #[test]
    fn template_questions_are_sampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Quiz.yaml");
        std::fs::write(
            &path,
            "prompt: p\nrequirements: r\nqa:\n  - question: a?\n    answer: x\n  - question: b?\n    answer: y\n",
        )
        .unwrap();

        let args = TestPromptArgs {
            questions: vec!["extra?".to_string()],
            template: Some(path),
            ..args()
        };
        let questions = args.collect_questions(1).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], "extra?");
    }
}

//! Optimize command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use spo_engine::{Optimizer, SpoConfig};
use spo_llm::{ModelSuite, ResponseMode};

use super::completion_client;
use super::template::resolve_template;
use crate::error::CliResult;

/// Flags left unset keep the value from the config file or environment.
#[derive(Debug, Args)]
pub struct OptimizeArgs {
    /// Model used to rewrite prompts
    #[arg(long)]
    pub opt_model: Option<String>,

    /// Temperature for prompt rewriting
    #[arg(long)]
    pub opt_temp: Option<f32>,

    /// Model used to judge candidates
    #[arg(long)]
    pub eval_model: Option<String>,

    /// Temperature for judging
    #[arg(long)]
    pub eval_temp: Option<f32>,

    /// Model used to execute prompts
    #[arg(long)]
    pub exec_model: Option<String>,

    /// Temperature for execution
    #[arg(long)]
    pub exec_temp: Option<f32>,

    /// Output directory
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// First round to run; above 1 resumes an existing run
    #[arg(long)]
    pub initial_round: Option<u32>,

    /// Number of rounds to run
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Template file, or a name under the templates directory
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Directory searched for template names
    #[arg(long, default_value = "settings")]
    pub templates_dir: PathBuf,

    /// Run name
    #[arg(long)]
    pub name: Option<String>,

    /// Execution response mode: base_model or reasoning_model
    #[arg(long)]
    pub mode: Option<ResponseMode>,

    /// Use a local echo client instead of the provider
    #[arg(long)]
    pub dry_run: bool,
}

impl OptimizeArgs {
    /// Apply explicitly given flags on top of `config`.
    pub fn apply(&self, config: &mut SpoConfig) {
        if let Some(model) = &self.opt_model {
            config.models.optimize.model = model.clone();
        }
        if let Some(temp) = self.opt_temp {
            config.models.optimize.temperature = temp;
        }
        if let Some(model) = &self.eval_model {
            config.models.evaluate.model = model.clone();
        }
        if let Some(temp) = self.eval_temp {
            config.models.evaluate.temperature = temp;
        }
        if let Some(model) = &self.exec_model {
            config.models.execute.model = model.clone();
        }
        if let Some(temp) = self.exec_temp {
            config.models.execute.temperature = temp;
        }
        if let Some(mode) = self.mode {
            config.models.execute.mode = mode;
        }
        if let Some(workspace) = &self.workspace {
            config.run.workspace = workspace.clone();
        }
        if let Some(round) = self.initial_round {
            config.run.initial_round = round;
        }
        if let Some(rounds) = self.max_rounds {
            config.run.max_rounds = rounds;
        }
        if let Some(name) = &self.name {
            config.run.name = name.clone();
        }
        if let Some(template) = &self.template {
            config.run.template = resolve_template(template, &self.templates_dir);
        }
    }
}

pub async fn run(config_path: Option<&Path>, args: OptimizeArgs) -> CliResult<()> {
    let mut config = SpoConfig::load(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    tracing::info!(
        template = %config.run.template.display(),
        name = %config.run.name,
        rounds = config.run.max_rounds,
        optimize = %config.models.optimize.model,
        evaluate = %config.models.evaluate.model,
        execute = %config.models.execute.model,
        "Optimization configured"
    );

    let client = completion_client(&config, args.dry_run)?;
    let models = Arc::new(ModelSuite::new(
        client,
        config.models.optimize.clone(),
        config.models.evaluate.clone(),
        config.models.execute.clone(),
    ));

    let optimizer = Optimizer::from_config(&config, models.clone()).await?;
    let report = optimizer.optimize(config.run.max_rounds).await?;

    println!("\n{}\n", report);
    println!("Usage: {}", models.usage());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> OptimizeArgs {
        OptimizeArgs {
            opt_model: None,
            opt_temp: None,
            eval_model: None,
            eval_temp: None,
            exec_model: None,
            exec_temp: None,
            workspace: None,
            initial_round: None,
            max_rounds: None,
            template: None,
            templates_dir: PathBuf::from("settings"),
            name: None,
            mode: None,
            dry_run: false,
        }
    }

    #[test]
    fn unset_flags_keep_config() {
        let mut config = SpoConfig::default();
        config.run.max_rounds = 3;
        args().apply(&mut config);
        assert_eq!(config.run.max_rounds, 3);
        assert_eq!(config.models.evaluate.temperature, 0.3);
    }

    #[test]
    fn flags_override_config() {
        let mut config = SpoConfig::default();
        let args = OptimizeArgs {
            opt_model: Some("gpt-4o".to_string()),
            exec_temp: Some(0.2),
            mode: Some(ResponseMode::ReasoningModel),
            initial_round: Some(4),
            name: Some("Summaries".to_string()),
            ..args()
        };
        args.apply(&mut config);

        assert_eq!(config.models.optimize.model, "gpt-4o");
        assert_eq!(config.models.execute.temperature, 0.2);
        assert_eq!(config.models.execute.mode, ResponseMode::ReasoningModel);
        assert_eq!(config.run.initial_round, 4);
        assert_eq!(config.run.name, "Summaries");
    }

    #[test]
    fn bare_template_name_resolves_under_templates_dir() {
        let mut config = SpoConfig::default();
        let args = OptimizeArgs {
            template: Some(PathBuf::from("Poem")),
            templates_dir: PathBuf::from("/nonexistent/settings"),
            ..args()
        };
        args.apply(&mut config);
        assert_eq!(config.run.template, PathBuf::from("/nonexistent/settings/Poem.yaml"));
    }
}

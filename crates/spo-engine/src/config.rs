//! Run configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! config file, `SPO_*` environment variables (nested keys joined with `__`,
//! e.g. `SPO_SEARCH__SAMPLE_K=5`), then whatever the CLI overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spo_llm::{CompletionConfig, ProviderSettings, DEFAULT_MODEL};
use spo_types::DEFAULT_SAMPLE_K;

use crate::{EngineError, EngineResult};

/// Default number of judged trials per comparison.
pub const DEFAULT_EVALUATION_TRIALS: usize = 4;

/// Default bound on in-flight execution requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpoConfig {
    #[serde(default)]
    pub run: RunSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub models: ModelSettings,

    #[serde(default)]
    pub provider: ProviderSettings,
}

/// Where a run reads its template and writes its rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// Root directory for run output.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Run name; output goes to `<workspace>/<name>/prompts`.
    #[serde(default = "default_name")]
    pub name: String,

    /// Template YAML path.
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Number of rounds to run.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// First round number; above 1 resumes an existing ledger.
    #[serde(default = "default_initial_round")]
    pub initial_round: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            name: default_name(),
            template: default_template(),
            max_rounds: default_max_rounds(),
            initial_round: default_initial_round(),
        }
    }
}

/// Knobs of the search itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Gold pairs sampled per round.
    #[serde(default = "default_sample_k")]
    pub sample_k: usize,

    /// Judged trials per comparison.
    #[serde(default = "default_evaluation_trials")]
    pub evaluation_trials: usize,

    /// Max concurrent execution requests.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Fixed seed for sampling and slot assignment.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            sample_k: default_sample_k(),
            evaluation_trials: default_evaluation_trials(),
            max_concurrency: default_max_concurrency(),
            seed: None,
        }
    }
}

/// Generation settings per request kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_optimize_model")]
    pub optimize: CompletionConfig,

    #[serde(default = "default_evaluate_model")]
    pub evaluate: CompletionConfig,

    #[serde(default = "default_execute_model")]
    pub execute: CompletionConfig,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            optimize: default_optimize_model(),
            evaluate: default_evaluate_model(),
            execute: default_execute_model(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_name() -> String {
    "Poem".to_string()
}

fn default_template() -> PathBuf {
    PathBuf::from("settings/Poem.yaml")
}

fn default_max_rounds() -> u32 {
    10
}

fn default_initial_round() -> u32 {
    1
}

fn default_sample_k() -> usize {
    DEFAULT_SAMPLE_K
}

fn default_evaluation_trials() -> usize {
    DEFAULT_EVALUATION_TRIALS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_optimize_model() -> CompletionConfig {
    CompletionConfig::new(DEFAULT_MODEL, 0.7)
}

fn default_evaluate_model() -> CompletionConfig {
    CompletionConfig::new(DEFAULT_MODEL, 0.3)
}

fn default_execute_model() -> CompletionConfig {
    CompletionConfig::new(DEFAULT_MODEL, 0.0)
}

impl SpoConfig {
    /// Load defaults, then `path` (if given), then `SPO_*` environment variables.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SpoConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SPO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> EngineResult<()> {
        if self.run.max_rounds == 0 {
            return Err(EngineError::Config("max_rounds must be at least 1".to_string()));
        }
        if self.run.initial_round == 0 {
            return Err(EngineError::Config("initial_round starts at 1".to_string()));
        }
        if self.run.name.trim().is_empty() {
            return Err(EngineError::Config("run name is empty".to_string()));
        }
        if self.search.sample_k == 0 {
            return Err(EngineError::Config("sample_k must be at least 1".to_string()));
        }
        if self.search.evaluation_trials == 0 {
            return Err(EngineError::Config(
                "evaluation_trials must be at least 1".to_string(),
            ));
        }
        if self.search.max_concurrency == 0 {
            return Err(EngineError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        for (role, model) in [
            ("optimize", &self.models.optimize),
            ("evaluate", &self.models.evaluate),
            ("execute", &self.models.execute),
        ] {
            if model.model.trim().is_empty() {
                return Err(EngineError::Config(format!("{} model id is empty", role)));
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(EngineError::Config(format!(
                    "{} temperature {} is outside [0, 2]",
                    role, model.temperature
                )));
            }
        }

        Ok(())
    }
}

//! CLI error types

use spo_engine::EngineError;
use spo_llm::LlmError;
use spo_types::TemplateError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Optimization run failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Completion client error
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    /// Template error
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

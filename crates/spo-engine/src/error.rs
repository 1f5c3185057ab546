//! Engine errors

use std::path::PathBuf;

use spo_llm::LlmError;
use spo_types::TemplateError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Result type for optimization runs.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a run.
///
/// Per-question execution failures and judged-trial failures never surface
/// here; they are absorbed inside their stage.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid settings, detected before any round runs.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The generator could not reach the completion capability.
    #[error("candidate generation failed in round {round}: {source}")]
    Generation {
        round: u32,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to write round artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only reachable when the ledger cannot be read back after the last round.
    #[error("ledger holds no accepted round")]
    NoAcceptedRound,
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

//! LLM client errors

use thiserror::Error;

/// Result type for completion calls.
pub type LlmResult<T> = Result<T, LlmError>;

/// Completion capability errors. Callers must not assume retries.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider returned a non-success status (quota, auth, bad request).
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// Provider answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Missing API key, empty model id, malformed endpoint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

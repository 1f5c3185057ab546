//! Round-indexed decision history.
//!
//! The ledger is the only state that crosses rounds. Every round appends
//! exactly one [`Decision`]; the controller asks it for the current best before
//! each new round.

mod file;
mod memory;

pub use file::{FileLedger, LEDGER_FILE};
pub use memory::InMemoryLedger;

use async_trait::async_trait;
use spo_types::Decision;
use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize decision: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt ledger entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("out-of-sequence append: expected round {expected}, got {found}")]
    OutOfSequence { expected: u32, found: u32 },
}

/// Append-only store of per-round decisions.
#[async_trait]
pub trait DecisionLedger: Send + Sync {
    /// Durably add one decision. Visible to every read that starts afterwards.
    async fn append(&self, decision: Decision) -> LedgerResult<()>;

    /// Full history in append order.
    async fn history(&self) -> LedgerResult<Vec<Decision>>;

    /// The most recently accepted decision, reloaded from the full history.
    async fn current_best(&self) -> LedgerResult<Option<Decision>> {
        let history = self.history().await?;
        Ok(most_recent_accepted(&history).cloned())
    }

    /// Highest recorded round, if any.
    async fn last_round(&self) -> LedgerResult<Option<u32>> {
        Ok(self.history().await?.iter().map(|d| d.round).max())
    }
}

/// Walk rounds from newest to oldest and stop at the first accepted one.
///
/// This is the tip of the hill-climbing chain, not the best-scoring entry.
pub fn most_recent_accepted(history: &[Decision]) -> Option<&Decision> {
    let mut ordered: Vec<&Decision> = history.iter().collect();
    ordered.sort_by(|a, b| b.round.cmp(&a.round));
    ordered.into_iter().find(|decision| decision.accepted)
}

/// Rounds are gap-free: a new round must follow the last one directly.
pub(crate) fn check_sequence(last: Option<u32>, round: u32) -> LedgerResult<()> {
    let expected = match last {
        Some(last) => last + 1,
        None if round == 0 => 1,
        None => return Ok(()),
    };
    if round != expected {
        return Err(LedgerError::OutOfSequence {
            expected,
            found: round,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn decision(round: u32, accepted: bool) -> Decision {
    Decision::record(
        spo_types::Candidate::new(
            round,
            format!("prompt {}", round),
            vec![spo_types::QaPair::new("q", format!("a{}", round))],
        ),
        accepted,
    )
}

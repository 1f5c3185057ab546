//! In-memory ledger

use async_trait::async_trait;
use parking_lot::RwLock;
use spo_types::Decision;

use super::{check_sequence, DecisionLedger, LedgerResult};

/// In-memory ledger for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    decisions: RwLock<Vec<Decision>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing history, bypassing sequence checks.
    pub fn with_history(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: RwLock::new(decisions),
        }
    }

    pub fn len(&self) -> usize {
        self.decisions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.read().is_empty()
    }
}

#[async_trait]
impl DecisionLedger for InMemoryLedger {
    async fn append(&self, decision: Decision) -> LedgerResult<()> {
        let mut decisions = self.decisions.write();
        let last = decisions.iter().map(|d| d.round).max();
        check_sequence(last, decision.round)?;
        decisions.push(decision);
        Ok(())
    }

    async fn history(&self) -> LedgerResult<Vec<Decision>> {
        Ok(self.decisions.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{decision, LedgerError};

    #[tokio::test]
    async fn append_then_read() {
        let ledger = InMemoryLedger::new();
        ledger.append(decision(1, true)).await.unwrap();
        ledger.append(decision(2, false)).await.unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_round().await.unwrap(), Some(2));
        assert_eq!(ledger.current_best().await.unwrap().unwrap().round, 1);
    }

    #[tokio::test]
    async fn rejects_gaps() {
        let ledger = InMemoryLedger::new();
        ledger.append(decision(1, true)).await.unwrap();

        let err = ledger.append(decision(3, true)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OutOfSequence { expected: 2, found: 3 }));
        assert_eq!(ledger.len(), 1);
    }
}

//! Candidates and recorded round decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::QaPair;

/// Characters per token used by the token cost proxy.
pub const CHARS_PER_TOKEN: usize = 4;

/// Approximate token cost of a set of answers.
///
/// This is the serialized JSON length divided by [`CHARS_PER_TOKEN`], rounded up.
/// It is informational only and never drives control flow.
pub fn estimate_token_cost(answers: &[QaPair]) -> u64 {
    let chars = serde_json::to_string(answers)
        .map(|json| json.chars().count())
        .unwrap_or_default();
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

/// The prompt produced in one round, paired with its generated answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub round: u32,
    pub prompt: String,
    pub answers: Vec<QaPair>,
    pub token_cost: u64,
}

impl Candidate {
    pub fn new(round: u32, prompt: impl Into<String>, answers: Vec<QaPair>) -> Self {
        let token_cost = estimate_token_cost(&answers);
        Self {
            round,
            prompt: prompt.into(),
            answers,
            token_cost,
        }
    }
}

/// Ledger entry for one round.
///
/// The on-disk field names (`succeed`, `tokens`, `time`) are kept stable so a
/// ledger from an earlier run can be resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub round: u32,
    pub prompt: String,
    pub answers: Vec<QaPair>,
    #[serde(rename = "succeed")]
    pub accepted: bool,
    #[serde(rename = "tokens", default)]
    pub token_cost: u64,
    #[serde(rename = "time", default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    /// Record the outcome for a candidate, stamped now.
    pub fn record(candidate: Candidate, accepted: bool) -> Self {
        Self {
            round: candidate.round,
            prompt: candidate.prompt,
            answers: candidate.answers,
            accepted,
            token_cost: candidate.token_cost,
            timestamp: Utc::now(),
        }
    }

    /// View this decision as the candidate it recorded.
    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            round: self.round,
            prompt: self.prompt.clone(),
            answers: self.answers.clone(),
            token_cost: self.token_cost,
        }
    }
}

//! Token usage accounting

use parking_lot::Mutex;
use serde::Serialize;

/// USD per 1K tokens, (input, output).
const PRICES: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini-2024-07-18", 0.00015, 0.0006),
    ("gpt-4o-mini", 0.00015, 0.0006),
    ("gpt-4o", 0.0025, 0.01),
    ("gpt-4.1-nano", 0.0001, 0.0004),
    ("gpt-4.1-mini", 0.0004, 0.0016),
    ("gpt-4.1", 0.002, 0.008),
];

/// Price per 1K tokens for `model` as `(input, output)`.
///
/// Exact names win; otherwise the first (most specific) known name contained in
/// `model` is used. Unknown models are free.
pub fn price_per_1k(model: &str) -> (f64, f64) {
    PRICES
        .iter()
        .find(|(name, _, _)| *name == model)
        .or_else(|| PRICES.iter().find(|(name, _, _)| model.contains(name)))
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((0.0, 0.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
}

impl UsageRecord {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
    pub call_count: usize,
}

impl std::fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} calls, {} input + {} output = {} tokens, ${:.6}",
            self.call_count,
            self.input_tokens,
            self.output_tokens,
            self.input_tokens + self.output_tokens,
            self.total_cost
        )
    }
}

/// Running token and cost totals across all calls of a run.
#[derive(Debug, Default)]
pub struct UsageTracker {
    history: Mutex<Vec<UsageRecord>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, model: &str, input_tokens: u64, output_tokens: u64) -> UsageRecord {
        let (input_price, output_price) = price_per_1k(model);
        let record = UsageRecord {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost: input_tokens as f64 / 1000.0 * input_price,
            output_cost: output_tokens as f64 / 1000.0 * output_price,
        };
        self.history.lock().push(record.clone());
        record
    }

    pub fn summary(&self) -> UsageSummary {
        let history = self.history.lock();
        history.iter().fold(
            UsageSummary {
                call_count: history.len(),
                ..UsageSummary::default()
            },
            |mut acc, record| {
                acc.input_tokens += record.input_tokens;
                acc.output_tokens += record.output_tokens;
                acc.total_cost += record.total_cost();
                acc
            },
        )
    }

    pub fn history(&self) -> Vec<UsageRecord> {
        self.history.lock().clone()
    }
}

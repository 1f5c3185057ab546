//! SPO optimization loop.
//!
//! A run is a greedy hill climb over prompts. Each round the [`Generator`]
//! rewrites the current best prompt, the [`Executor`] answers a sampled batch
//! of gold questions with it, the [`Comparator`] runs order-randomized judged
//! trials against the current best, and the outcome is appended to a
//! [`DecisionLedger`]. The [`Optimizer`] sequences the rounds.
//!
//! ```text
//! ledger.current_best ─▶ generator ─▶ executor ─▶ comparator ─▶ ledger.append
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod artifacts;
pub mod comparator;
pub mod config;
pub mod controller;
mod error;
pub mod execution;
pub mod generator;
pub mod ledger;
mod parse;
mod prompts;

pub use artifacts::RunLayout;
pub use comparator::{debias, tally, Choice, Comparator, SlotAssignment, Verdict};
pub use crate::config::{ModelSettings, RunSettings, SearchSettings, SpoConfig};
pub use controller::{FinalReport, Optimizer};
pub use error::{EngineError, EngineResult};
pub use execution::Executor;
pub use generator::{Generator, Proposal};
pub use ledger::{
    most_recent_accepted, DecisionLedger, FileLedger, InMemoryLedger, LedgerError, LedgerResult,
    LEDGER_FILE,
};
pub use parse::extract_tag;

//! SPO core data model.
//!
//! This crate defines the values that flow through an optimization run:
//! - `QaPair`: one question with its answer (gold or generated)
//! - `Candidate`: the prompt produced in a round together with its answers
//! - `Decision`: the ledger entry recording whether a candidate was accepted
//! - `Template`: the read-only run input (seed prompt, requirements, gold set)
//!
//! Everything here is plain data. Scheduling, storage and model access live in
//! `spo-engine` and `spo-llm`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod qa;
mod round;
mod template;

pub use qa::{render_answers_artifact, render_markdown, QaPair};
pub use round::{estimate_token_cost, Candidate, Decision, CHARS_PER_TOKEN};
pub use template::{
    length_clause, sample_qa, Template, TemplateDocument, TemplateError, TemplateResult,
    DEFAULT_SAMPLE_K,
};

//! Completion capability for SPO.
//!
//! The optimizer never talks to a provider directly. It holds a [`ModelSuite`]:
//! one [`CompletionClient`] handle plus a [`CompletionConfig`] per request kind
//! (optimize, evaluate, execute). The suite is built once at run start and shared
//! by reference, so tests can swap in a [`ScriptedClient`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod client;
mod error;
mod message;
mod openai;
mod scripted;
mod suite;
mod usage;

pub use client::CompletionClient;
pub use error::{LlmError, LlmResult};
pub use message::{ChatMessage, Completion, CompletionConfig, ResponseMode, Role};
pub use openai::{OpenAiCompatibleClient, ProviderSettings, AUTH_ENV_VAR, DEFAULT_BASE_URL};
pub use scripted::ScriptedClient;
pub use suite::{ModelSuite, RequestKind};
pub use usage::{price_per_1k, UsageRecord, UsageSummary, UsageTracker};

/// Model used for every role unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

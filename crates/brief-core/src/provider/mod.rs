//! LLM provider access for the chat-completion and scoring proxies.
//!
//! ```text
//! ProviderSet --select()--> (Anthropic | OpenAI, config)
//!     |
//! LlmClient::complete --> ProviderResponse::{Anthropic, OpenAi} --text()--> String
//!     |
//!     +-- chat()  --> ChatCompletion { reply, state, quality_score }
//!     +-- score() --> Score { quality_score, gaps, rationale }
//! ```

pub mod client;
pub mod config;
pub mod wire;

use thiserror::Error;

pub use client::{ChatCompletion, LlmClient, Score, extract_json, normalize_chat, parse_score};
pub use config::{ProviderConfig, ProviderKind, ProviderSet};
pub use wire::ProviderResponse;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider key is configured. This is a server misconfiguration,
    /// reported before any network call.
    #[error("no LLM provider API key configured (set ANTHROPIC_API_KEY or OPENAI_API_KEY)")]
    MissingApiKey,

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model's reply could not be read as the expected structure.
    #[error("could not parse provider reply: {0}")]
    Parse(String),
}

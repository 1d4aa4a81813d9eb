//! Provider request/response payloads.
//!
//! Each provider answers with a differently shaped body. Responses are kept
//! as a tagged union and normalized through [`ProviderResponse::text`] before
//! anything else looks at them.

use serde::{Deserialize, Serialize};

use crate::assistant::{Message, Role};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MAX_TOKENS: u32 = 2048;

// ---------------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AnthropicRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
    pub messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub content: Vec<AnthropicBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenAI Chat Completions API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(m: &'a Message) -> Self {
        let role = match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: &m.content,
        }
    }
}

/// A raw provider response, tagged by provider.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Anthropic(AnthropicResponse),
    OpenAi(OpenAiResponse),
}

impl ProviderResponse {
    /// Concatenated reply text.
    pub fn text(&self) -> String {
        match self {
            Self::Anthropic(r) => r
                .content
                .iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
            Self::OpenAi(r) => r
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default(),
        }
    }
}

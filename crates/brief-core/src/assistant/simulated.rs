//! Local, deterministic stand-in for the live assistant.
//!
//! Makes no network calls and keeps no state: the reply depends only on the
//! latest user message.

use async_trait::async_trait;

use super::trait_def::{Assistant, AssistantError};
use super::types::ChatRequest;

/// Longest excerpt of the user's text quoted back in a reply.
pub const EXCERPT_CHARS: usize = 160;

const UPLOAD_MARKER: &str = "I uploaded the file";
const COLUMNS_PREFIX: &str = "Columns: ";

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAssistant;

impl SimulatedAssistant {
    pub fn new() -> Self {
        Self
    }

    /// The reply for a given user text.
    pub fn respond(text: &str) -> String {
        let text = text.trim();
        if text.starts_with(UPLOAD_MARKER) {
            let columns: Vec<&str> = text
                .lines()
                .find_map(|l| l.strip_prefix(COLUMNS_PREFIX))
                .map(|cols| {
                    cols.split(", ")
                        .filter(|c| !c.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            return format!(
                "(simulated) Thanks, I can see {} columns: {}. In live mode I would fold these \
                 audiences into the content matrix.",
                columns.len(),
                columns.join(", ")
            );
        }

        if text.is_empty() {
            return "(simulated) I didn't catch that. Tell me about the campaign you are planning."
                .to_string();
        }

        format!(
            "(simulated) Noted: \"{}\". Tell me more about the audience, the single-minded \
             proposition, or the channels you want to use.",
            excerpt(text)
        )
    }
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[async_trait]
impl Assistant for SimulatedAssistant {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, AssistantError> {
        let text = request
            .last_user_message()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(Self::respond(text))
    }
}

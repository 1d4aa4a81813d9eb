//! HTTP client for the chat-completion and scoring proxies.

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::ProviderError;
use super::config::{ProviderKind, ProviderSet};
use super::wire::{
    ANTHROPIC_VERSION, AnthropicRequest, AnthropicResponse, MAX_TOKENS, OpenAiRequest,
    OpenAiResponse, ProviderResponse, WireMessage,
};
use crate::assistant::{Message, Role};

/// Upper bound of the quality score scale.
pub const MAX_SCORE: f64 = 10.0;
/// Maximum number of gaps reported by a score.
pub const MAX_GAPS: usize = 3;

const CHAT_SYSTEM_PROMPT: &str = "You are a senior marketing strategist helping a user \
co-author a campaign brief. Reply with a single JSON object with the keys \"reply\" \
(your conversational answer), \"state\" (the updated plan as JSON), and \"quality_score\" \
(a number from 0 to 10 rating the brief's completeness).";

const SCORE_SYSTEM_PROMPT: &str = "You review campaign briefs. Reply with a single JSON \
object with the keys \"quality_score\" (number from 0 to 10), \"gaps\" (at most three short \
strings naming what is missing), and \"rationale\" (one short paragraph).";

/// Normalized answer of the chat-completion proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub reply: String,
    pub state: Value,
    pub quality_score: Option<f64>,
}

/// Normalized answer of the scoring proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub quality_score: f64,
    pub gaps: Vec<String>,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawScore {
    quality_score: f64,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    rationale: String,
}

/// Calls whichever provider [`ProviderSet::select`] picks.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    providers: ProviderSet,
}

impl LlmClient {
    pub fn new(providers: ProviderSet) -> Self {
        Self {
            http: Client::new(),
            providers,
        }
    }

    /// Send one completion request and return the normalized reply text.
    ///
    /// Fails with [`ProviderError::MissingApiKey`] before any network call
    /// when no key is configured. Non-success responses keep their status
    /// and raw body.
    pub async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, ProviderError> {
        let (kind, cfg) = self.providers.select()?;
        let key = cfg.key().ok_or(ProviderError::MissingApiKey)?;
        debug!(provider = %kind, model = %cfg.model, messages = messages.len(), "calling provider");

        let response = match kind {
            ProviderKind::Anthropic => {
                // The Messages API requires the conversation to open with a user turn.
                let body = AnthropicRequest {
                    model: &cfg.model,
                    max_tokens: MAX_TOKENS,
                    system,
                    messages: messages
                        .iter()
                        .skip_while(|m| m.role == Role::Assistant)
                        .map(WireMessage::from)
                        .collect(),
                };
                self.http
                    .post(format!("{}/v1/messages", cfg.base_url))
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
                    .send()
                    .await?
            }
            ProviderKind::OpenAi => {
                let mut wire = vec![WireMessage {
                    role: "system",
                    content: system,
                }];
                wire.extend(messages.iter().map(WireMessage::from));
                let body = OpenAiRequest {
                    model: &cfg.model,
                    messages: wire,
                };
                self.http
                    .post(format!("{}/chat/completions", cfg.base_url))
                    .header(header::AUTHORIZATION, format!("Bearer {key}"))
                    .json(&body)
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %kind, status = status.as_u16(), "provider returned an error");
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = match kind {
            ProviderKind::Anthropic => {
                ProviderResponse::Anthropic(response.json::<AnthropicResponse>().await?)
            }
            ProviderKind::OpenAi => ProviderResponse::OpenAi(response.json::<OpenAiResponse>().await?),
        };
        Ok(parsed.text())
    }

    /// Chat-completion proxy.
    pub async fn chat(
        &self,
        history: &[Message],
        current_plan: &Value,
    ) -> Result<ChatCompletion, ProviderError> {
        let system = format!(
            "{CHAT_SYSTEM_PROMPT}\n\nCurrent plan:\n{}",
            serde_json::to_string_pretty(current_plan).unwrap_or_default()
        );
        let text = self.complete(&system, history).await?;
        Ok(normalize_chat(&text, current_plan))
    }

    /// Scoring proxy.
    pub async fn score(&self, plan: &Value) -> Result<Score, ProviderError> {
        let prompt = format!(
            "Score this campaign brief:\n{}",
            serde_json::to_string_pretty(plan).unwrap_or_default()
        );
        let text = self
            .complete(SCORE_SYSTEM_PROMPT, &[Message::user(prompt)])
            .await?;
        parse_score(&text)
    }
}

/// Interpret a chat answer. Structured answers supply all three fields; plain
/// text becomes the reply and the plan is echoed back unchanged.
pub fn normalize_chat(text: &str, current_plan: &Value) -> ChatCompletion {
    match extract_json(text) {
        Some(Value::Object(obj)) if obj.get("reply").is_some_and(Value::is_string) => {
            ChatCompletion {
                reply: obj["reply"].as_str().unwrap_or_default().to_string(),
                state: obj
                    .get("state")
                    .filter(|s| !s.is_null())
                    .cloned()
                    .unwrap_or_else(|| current_plan.clone()),
                quality_score: obj
                    .get("quality_score")
                    .and_then(Value::as_f64)
                    .map(|s| s.clamp(0.0, MAX_SCORE)),
            }
        }
        _ => ChatCompletion {
            reply: text.trim().to_string(),
            state: current_plan.clone(),
            quality_score: None,
        },
    }
}

/// Interpret a scoring answer. The score is clamped to `0..=10` and at most
/// [`MAX_GAPS`] gaps are kept.
pub fn parse_score(text: &str) -> Result<Score, ProviderError> {
    let value = extract_json(text)
        .ok_or_else(|| ProviderError::Parse("model reply contained no JSON object".into()))?;
    let raw: RawScore =
        serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let mut gaps = raw.gaps;
    gaps.truncate(MAX_GAPS);
    Ok(Score {
        quality_score: raw.quality_score.clamp(0.0, MAX_SCORE),
        gaps,
        rationale: raw.rationale,
    })
}

/// Find the JSON object in a model reply, tolerating code fences and prose
/// around it.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

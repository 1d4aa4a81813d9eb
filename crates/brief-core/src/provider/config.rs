//! Provider credentials, models, and selection.

use std::fmt;

use super::ProviderError;

/// Supported LLM providers, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        };
        f.write_str(s)
    }
}

/// Settings for a single provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderConfig {
    pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
    pub const ANTHROPIC_URL: &str = "https://api.anthropic.com";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const OPENAI_URL: &str = "https://api.openai.com/v1";

    pub fn anthropic(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: Self::ANTHROPIC_MODEL.to_string(),
            base_url: Self::ANTHROPIC_URL.to_string(),
        }
    }

    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: Self::OPENAI_MODEL.to_string(),
            base_url: Self::OPENAI_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API key, treating an empty string as absent.
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Both providers' settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSet {
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
}

impl Default for ProviderSet {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::anthropic(None),
            openai: ProviderConfig::openai(None),
        }
    }
}

impl ProviderSet {
    /// Pick the provider to call: Anthropic when its key is set, otherwise
    /// OpenAI when its key is set.
    pub fn select(&self) -> Result<(ProviderKind, &ProviderConfig), ProviderError> {
        if self.anthropic.key().is_some() {
            Ok((ProviderKind::Anthropic, &self.anthropic))
        } else if self.openai.key().is_some() {
            Ok((ProviderKind::OpenAi, &self.openai))
        } else {
            Err(ProviderError::MissingApiKey)
        }
    }

    pub fn has_key(&self) -> bool {
        self.select().is_ok()
    }
}

//! Configuration file management for brief.
//!
//! Provides a TOML-based config file at `~/.config/briefsmith/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use brief_core::assistant::BackendClient;
use brief_core::provider::{ProviderConfig, ProviderSet};

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const BACKEND_URL: &str = "BRIEF_BACKEND_URL";
pub const PDF_RENDERER_URL: &str = "BRIEF_PDF_RENDERER_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub providers: ProvidersSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub renderer: RendererSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProvidersSection {
    #[serde(default)]
    pub anthropic: ProviderSection,
    #[serde(default)]
    pub openai: ProviderSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Alternate endpoint, e.g. a gateway in front of the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendSection {
    pub url: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: BackendClient::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RendererSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the briefsmith config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/briefsmith` or
/// `~/.config/briefsmith`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("briefsmith");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("briefsmith")
}

/// Return the path to the briefsmith config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold API keys, so it is made owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Flags that take part in resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub backend_url: Option<&'a str>,
    pub renderer_url: Option<&'a str>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct BriefConfig {
    pub providers: ProviderSet,
    pub backend_url: String,
    pub pdf_renderer_url: Option<String>,
}

impl BriefConfig {
    /// Resolve configuration from the flags, the environment, and the config
    /// file when one exists.
    pub fn resolve(cli: CliOverrides<'_>) -> Result<Self> {
        let file_config = if config_path().exists() {
            load_config()?
        } else {
            ConfigFile::default()
        };
        Ok(Self::resolve_from(cli, file_config))
    }

    /// Resolution chain: CLI flag > env var > config file > default.
    ///
    /// - API keys: env > file > none
    /// - Models: env > file > provider default
    /// - Backend URL: flag > `BRIEF_BACKEND_URL` > file > `http://localhost:8000`
    /// - PDF renderer URL: flag > `BRIEF_PDF_RENDERER_URL` > file > none
    pub fn resolve_from(cli: CliOverrides<'_>, file: ConfigFile) -> Self {
        let ProvidersSection { anthropic, openai } = file.providers;

        let providers = ProviderSet {
            anthropic: provider(
                ProviderConfig::anthropic(env(ANTHROPIC_API_KEY).or(anthropic.api_key)),
                env(ANTHROPIC_MODEL).or(anthropic.model),
                anthropic.base_url,
            ),
            openai: provider(
                ProviderConfig::openai(env(OPENAI_API_KEY).or(openai.api_key)),
                env(OPENAI_MODEL).or(openai.model),
                openai.base_url,
            ),
        };

        let backend_url = cli
            .backend_url
            .map(str::to_string)
            .or_else(|| env(BACKEND_URL))
            .unwrap_or(file.backend.url);

        let pdf_renderer_url = cli
            .renderer_url
            .map(str::to_string)
            .or_else(|| env(PDF_RENDERER_URL))
            .or(file.renderer.url);

        Self {
            providers,
            backend_url,
            pdf_renderer_url,
        }
    }
}

fn provider(base: ProviderConfig, model: Option<String>, url: Option<String>) -> ProviderConfig {
    let base = match model {
        Some(m) => base.with_model(m),
        None => base,
    };
    match url {
        Some(u) => base.with_base_url(u),
        None => base,
    }
}

/// An environment variable, treating empty values as unset.
fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

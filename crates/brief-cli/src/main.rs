mod chat_cmd;
mod config;
mod export_cmd;
mod feed_cmd;
mod ingest_cmd;
mod resolve;
mod score_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use brief_core::export::ExportFormat;

use config::{BriefConfig, CliOverrides};

#[derive(Parser)]
#[command(name = "brief", about = "Co-author campaign briefs with an LLM assistant")]
struct Cli {
    /// Backend base URL (overrides BRIEF_BACKEND_URL env var)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a briefsmith config file
    Init {
        /// Anthropic API key to store
        #[arg(long)]
        anthropic_key: Option<String>,
        /// OpenAI API key to store
        #[arg(long)]
        openai_key: Option<String>,
        /// Backend URL used by `brief chat`
        #[arg(long, default_value = "http://localhost:8000")]
        url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the backend server (chat, upload, export, feed, LLM proxies)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Answer /chat with the local simulator when no provider key is set
        #[arg(long)]
        simulate: bool,
        /// PDF renderer URL (overrides BRIEF_PDF_RENDERER_URL env var)
        #[arg(long)]
        renderer_url: Option<String>,
    },
    /// Start an interactive chat session on a workspace
    Chat {
        /// Workspace file (created on save if missing)
        #[arg(long, default_value = resolve::DEFAULT_WORKSPACE)]
        workspace: PathBuf,
        /// Start in simulated mode (no backend calls)
        #[arg(long)]
        simulate: bool,
    },
    /// Ingest a file as `/upload` would and print the result
    Ingest {
        /// File to ingest (.csv files are parsed as tables)
        file: PathBuf,
        /// Also store a tabular file as this workspace's audience context
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Export a workspace as json, txt, csv, or pdf
    Export {
        /// Output format
        #[arg(long, short, default_value = "txt")]
        format: ExportFormat,
        /// Workspace file
        #[arg(long, default_value = resolve::DEFAULT_WORKSPACE)]
        workspace: PathBuf,
        /// Output file path (defaults to stdout; pdf defaults to a dated file)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Score a workspace's brief with the configured LLM provider
    Score {
        /// Workspace file
        #[arg(long, default_value = resolve::DEFAULT_WORKSPACE)]
        workspace: PathBuf,
    },
    /// Generate a dynamic-creative feed from a media plan CSV
    Feed {
        /// Media plan CSV
        media_plan: PathBuf,
        /// Audience strategy text (first line is the fallback headline)
        #[arg(long)]
        strategy: Option<String>,
        /// Image URL to assign round-robin (repeatable)
        #[arg(long = "asset")]
        assets: Vec<String>,
        /// Ask the backend instead of generating locally
        #[arg(long)]
        remote: bool,
    },
}

/// Execute the `brief init` command: write config file.
fn cmd_init(
    anthropic_key: Option<String>,
    openai_key: Option<String>,
    url: &str,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = anthropic_key.is_some() || openai_key.is_some();
    let cfg = config::ConfigFile {
        providers: config::ProvidersSection {
            anthropic: config::ProviderSection {
                api_key: anthropic_key,
                ..Default::default()
            },
            openai: config::ProviderSection {
                api_key: openai_key,
                ..Default::default()
            },
        },
        backend: config::BackendSection {
            url: url.to_string(),
        },
        renderer: config::RendererSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  backend.url = {url}");
    if !has_key {
        println!();
        println!("No provider key stored. Set ANTHROPIC_API_KEY or OPENAI_API_KEY before `brief serve`.");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        backend_url: cli.backend_url.as_deref(),
        renderer_url: None,
    };

    match cli.command {
        Commands::Init {
            anthropic_key,
            openai_key,
            url,
            force,
        } => {
            cmd_init(anthropic_key, openai_key, &url, force)?;
        }
        Commands::Serve {
            bind,
            port,
            simulate,
            renderer_url,
        } => {
            let resolved = BriefConfig::resolve(CliOverrides {
                renderer_url: renderer_url.as_deref(),
                ..overrides
            })?;
            serve_cmd::run_serve(&resolved, &bind, port, simulate).await?;
        }
        Commands::Chat {
            workspace,
            simulate,
        } => {
            let resolved = BriefConfig::resolve(overrides)?;
            chat_cmd::run_chat(&resolved, &workspace, simulate).await?;
        }
        Commands::Ingest { file, workspace } => {
            ingest_cmd::run_ingest(&file, workspace.as_deref())?;
        }
        Commands::Export {
            format,
            workspace,
            output,
        } => {
            let resolved = BriefConfig::resolve(overrides)?;
            export_cmd::run_export(&resolved, &workspace, format, output.as_deref()).await?;
        }
        Commands::Score { workspace } => {
            let resolved = BriefConfig::resolve(overrides)?;
            score_cmd::run_score(&resolved, &workspace).await?;
        }
        Commands::Feed {
            media_plan,
            strategy,
            assets,
            remote,
        } => {
            let resolved = BriefConfig::resolve(overrides)?;
            feed_cmd::run_feed(&resolved, &media_plan, strategy.as_deref(), assets, remote)
                .await?;
        }
    }

    Ok(())
}

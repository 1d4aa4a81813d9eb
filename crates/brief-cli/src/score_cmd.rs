use std::path::Path;

use anyhow::Context;

use brief_core::provider::{LlmClient, Score};

use crate::config::BriefConfig;
use crate::resolve;

/// Ask the configured LLM provider to score a workspace's brief.
pub async fn run_score(config: &BriefConfig, workspace: &Path) -> anyhow::Result<()> {
    let (doc, store) = resolve::require_workspace(workspace)?;
    let client = LlmClient::new(config.providers.clone());
    let score = client
        .score(&doc.snapshot(&store))
        .await
        .context("scoring failed")?;
    print!("{}", format_score(&score));
    Ok(())
}

fn format_score(score: &Score) -> String {
    let mut out = format!("Quality score: {:.1}/10\n", score.quality_score);
    if !score.gaps.is_empty() {
        out.push_str("Gaps:\n");
        for gap in &score.gaps {
            out.push_str(&format!("  - {gap}\n"));
        }
    }
    if !score.rationale.is_empty() {
        out.push('\n');
        out.push_str(&score.rationale);
        out.push('\n');
    }
    out
}

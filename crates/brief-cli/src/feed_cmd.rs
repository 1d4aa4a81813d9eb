use std::path::Path;

use anyhow::Context;

use brief_core::assistant::BackendClient;
use brief_core::feed::{self, FeedRequest, FeedResponse};
use brief_core::tabular;

use crate::config::BriefConfig;

/// Build a dynamic-creative feed from a media plan CSV and print it as JSON.
pub async fn run_feed(
    config: &BriefConfig,
    media_plan: &Path,
    strategy: Option<&str>,
    assets: Vec<String>,
    remote: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(media_plan)
        .with_context(|| format!("failed to read {}", media_plan.display()))?;
    let request = FeedRequest {
        audience_strategy: strategy.unwrap_or_default().to_string(),
        asset_list: assets,
        media_plan_rows: tabular::parse(&raw).rows,
    };

    let rows = if remote {
        let backend = BackendClient::new(&config.backend_url);
        backend
            .generate_feed(&request)
            .await
            .with_context(|| format!("feed generation via {} failed", backend.base_url()))?
    } else {
        feed::generate_feed(&request)
    };

    println!("{}", serde_json::to_string_pretty(&FeedResponse { feed: rows })?);
    Ok(())
}

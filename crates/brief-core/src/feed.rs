//! Dynamic-creative feed generation for `/generate-feed`.
//!
//! One feed row per media-plan row. Values are looked up from the row by a
//! short list of candidate column names (case-insensitive); gaps are filled
//! from the audience strategy and the asset list.

use serde::{Deserialize, Serialize};

use crate::tabular::Row;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    #[serde(default)]
    pub audience_strategy: String,
    /// Image URLs, assigned to rows round-robin.
    #[serde(default)]
    pub asset_list: Vec<String>,
    #[serde(default)]
    pub media_plan_rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRow {
    #[serde(rename = "Unique_ID")]
    pub unique_id: String,
    #[serde(rename = "Headline")]
    pub headline: String,
    #[serde(rename = "Image_URL")]
    pub image_url: String,
    #[serde(rename = "Exit_URL")]
    pub exit_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub feed: Vec<FeedRow>,
}

const ID_KEYS: &[&str] = &["unique_id", "id", "asset_id"];
const HEADLINE_KEYS: &[&str] = &["headline", "message"];
const IMAGE_KEYS: &[&str] = &["image_url"];
const EXIT_KEYS: &[&str] = &["exit_url", "url", "landing_page"];

/// Build the feed. Deterministic for a given request.
pub fn generate_feed(req: &FeedRequest) -> Vec<FeedRow> {
    let fallback_headline = req
        .audience_strategy
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    req.media_plan_rows
        .iter()
        .enumerate()
        .map(|(i, row)| FeedRow {
            unique_id: pick(row, ID_KEYS)
                .map(str::to_string)
                .unwrap_or_else(|| format!("feed-{}", i + 1)),
            headline: pick(row, HEADLINE_KEYS)
                .unwrap_or(fallback_headline)
                .to_string(),
            image_url: pick(row, IMAGE_KEYS)
                .map(str::to_string)
                .or_else(|| {
                    (!req.asset_list.is_empty())
                        .then(|| req.asset_list[i % req.asset_list.len()].clone())
                })
                .unwrap_or_default(),
            exit_url: pick(row, EXIT_KEYS).unwrap_or("").to_string(),
        })
        .collect()
}

/// First non-empty value whose key matches one of `candidates`, in candidate
/// order.
fn pick<'a>(row: &'a Row, candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|want| {
        row.iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(want) && !v.trim().is_empty())
            .map(|(_, v)| v.trim())
    })
}

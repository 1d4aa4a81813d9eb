//! The plan document: narrative fields plus the last ingested audience
//! context.
//!
//! `content_matrix` and `concepts` are not stored here. They are derived from
//! the [`crate::store::ContentStore`] whenever a canonical document is
//! assembled (see [`crate::export::assemble`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::export;
use crate::store::ContentStore;
use crate::tabular::{Row, TabularContext};

/// Canonical in-memory brief.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub single_minded_proposition: String,
    #[serde(default)]
    pub narrative_brief: String,
    /// Rows of the last uploaded audience/media file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_matrix: Option<Vec<Row>>,
    /// Headers of the last uploaded audience/media file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_headers: Option<Vec<String>>,
}

impl PlanDocument {
    pub fn new(campaign_name: impl Into<String>) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            ..Self::default()
        }
    }

    /// Replace the audience context wholesale. Nothing from a previous upload
    /// survives.
    pub fn replace_audience_context(&mut self, ctx: TabularContext) {
        let TabularContext { headers, rows } = ctx;
        self.audience_headers = Some(headers);
        self.audience_matrix = Some(rows);
    }

    /// The stored audience context, if one was ever ingested.
    pub fn audience_context(&self) -> Option<TabularContext> {
        match (&self.audience_headers, &self.audience_matrix) {
            (Some(headers), Some(rows)) => Some(TabularContext {
                headers: headers.clone(),
                rows: rows.clone(),
            }),
            _ => None,
        }
    }

    pub fn field(&self, field: PlanField) -> &str {
        match field {
            PlanField::CampaignName => &self.campaign_name,
            PlanField::SingleMindedProposition => &self.single_minded_proposition,
            PlanField::NarrativeBrief => &self.narrative_brief,
        }
    }

    pub fn set_field(&mut self, field: PlanField, value: impl Into<String>) {
        let value = value.into();
        match field {
            PlanField::CampaignName => self.campaign_name = value,
            PlanField::SingleMindedProposition => self.single_minded_proposition = value,
            PlanField::NarrativeBrief => self.narrative_brief = value,
        }
    }

    /// The plan as JSON with `content_matrix` and `concepts` derived from the
    /// store. This is the `current_plan` sent with every chat turn.
    pub fn snapshot(&self, store: &ContentStore) -> Value {
        let canonical = export::assemble_snapshot(self, &store.snapshot());
        serde_json::to_value(canonical).unwrap_or(Value::Null)
    }
}

/// Narrative field of a [`PlanDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    CampaignName,
    SingleMindedProposition,
    NarrativeBrief,
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CampaignName => "campaign_name",
            Self::SingleMindedProposition => "single_minded_proposition",
            Self::NarrativeBrief => "narrative_brief",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanField {
    type Err = PlanFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "campaign_name" | "name" => Ok(Self::CampaignName),
            "single_minded_proposition" | "smp" => Ok(Self::SingleMindedProposition),
            "narrative_brief" | "narrative" => Ok(Self::NarrativeBrief),
            other => Err(PlanFieldParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanField`] string.
#[derive(Debug, Clone)]
pub struct PlanFieldParseError(pub String);

impl fmt::Display for PlanFieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan field: {:?}", self.0)
    }
}

impl std::error::Error for PlanFieldParseError {}

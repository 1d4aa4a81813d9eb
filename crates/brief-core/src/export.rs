//! Export serializer: projects a plan document and the matrix/concept store
//! into a [`CanonicalDocument`], then renders it.
//!
//! Field order in the canonical document is part of its compatibility
//! contract and follows struct declaration order:
//!
//! - matrix rows: `asset_id, audience_segment, funnel_stage, trigger,
//!   channel, format, message, variant` (the row `id` becomes `asset_id`)
//! - concepts: `id, asset_id, title, description, notes`
//!
//! PDF output is never produced here. The canonical document is posted to the
//! backend's `/export/pdf` endpoint instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::PlanDocument;
use crate::store::{Concept, MatrixRow, StoreSnapshot};
use crate::tabular::{self, Row, TabularContext};

/// Title used in text output when the campaign has no name yet.
pub const UNTITLED: &str = "Untitled Campaign";

/// Matrix field names in canonical order.
pub const MATRIX_COLUMNS: [&str; 8] = [
    "asset_id",
    "audience_segment",
    "funnel_stage",
    "trigger",
    "channel",
    "format",
    "message",
    "variant",
];

// ---------------------------------------------------------------------------
// Canonical document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixRowExport {
    pub asset_id: String,
    pub audience_segment: String,
    pub funnel_stage: String,
    pub trigger: String,
    pub channel: String,
    pub format: String,
    pub message: String,
    pub variant: String,
}

impl MatrixRowExport {
    /// Values in [`MATRIX_COLUMNS`] order.
    pub fn values(&self) -> [&str; 8] {
        [
            &self.asset_id,
            &self.audience_segment,
            &self.funnel_stage,
            &self.trigger,
            &self.channel,
            &self.format,
            &self.message,
            &self.variant,
        ]
    }
}

impl From<&MatrixRow> for MatrixRowExport {
    fn from(row: &MatrixRow) -> Self {
        Self {
            asset_id: row.id.clone(),
            audience_segment: row.audience_segment.clone(),
            funnel_stage: row.funnel_stage.clone(),
            trigger: row.trigger.clone(),
            channel: row.channel.clone(),
            format: row.format.clone(),
            message: row.message.clone(),
            variant: row.variant.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptExport {
    pub id: String,
    pub asset_id: String,
    pub title: String,
    pub description: String,
    pub notes: String,
}

impl From<&Concept> for ConceptExport {
    fn from(c: &Concept) -> Self {
        Self {
            id: c.id.clone(),
            asset_id: c.asset_id.clone(),
            title: c.title.clone(),
            description: c.description.clone(),
            notes: c.notes.clone(),
        }
    }
}

/// The exact field-ordered structure handed to every renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalDocument {
    pub campaign_name: String,
    pub single_minded_proposition: String,
    pub narrative_brief: String,
    pub content_matrix: Vec<MatrixRowExport>,
    pub concepts: Vec<ConceptExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_matrix: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_headers: Option<Vec<String>>,
}

/// Build the canonical document from a plan and the live collections.
pub fn assemble(doc: &PlanDocument, rows: &[MatrixRow], concepts: &[Concept]) -> CanonicalDocument {
    CanonicalDocument {
        campaign_name: doc.campaign_name.clone(),
        single_minded_proposition: doc.single_minded_proposition.clone(),
        narrative_brief: doc.narrative_brief.clone(),
        content_matrix: rows.iter().map(MatrixRowExport::from).collect(),
        concepts: concepts.iter().map(ConceptExport::from).collect(),
        audience_matrix: doc.audience_matrix.clone(),
        audience_headers: doc.audience_headers.clone(),
    }
}

/// [`assemble`] from a store snapshot.
pub fn assemble_snapshot(doc: &PlanDocument, snapshot: &StoreSnapshot) -> CanonicalDocument {
    assemble(doc, &snapshot.rows, &snapshot.concepts)
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// Output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Txt,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Txt => "text/plain; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether this format is rendered in-process.
    pub fn is_local(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "txt" | "text" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::UnknownFormat(other.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format {0:?} (expected json, txt, csv, or pdf)")]
    UnknownFormat(String),

    #[error("{0} export is rendered by the backend, not locally")]
    RemoteOnly(ExportFormat),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Render a locally supported format to bytes.
pub fn render(doc: &CanonicalDocument, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Json => Ok(render_json(doc)?.into_bytes()),
        ExportFormat::Txt => Ok(render_text(doc).into_bytes()),
        ExportFormat::Csv => Ok(render_matrix_csv(&doc.content_matrix).into_bytes()),
        ExportFormat::Pdf => Err(ExportError::RemoteOnly(format)),
    }
}

/// Pretty-printed JSON of the canonical document.
pub fn render_json(doc: &CanonicalDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Deterministic human-readable rendering.
///
/// Title, separator, SMP, optional narrative block, then one line per matrix
/// row and one line per concept.
pub fn render_text(doc: &CanonicalDocument) -> String {
    let title = if doc.campaign_name.is_empty() {
        UNTITLED
    } else {
        doc.campaign_name.as_str()
    };

    let mut lines: Vec<String> = vec![
        title.to_string(),
        "=".repeat(title.chars().count()),
        format!("SMP: {}", doc.single_minded_proposition),
    ];

    let narrative = doc.narrative_brief.trim_end();
    if !narrative.is_empty() {
        lines.extend(narrative.lines().map(str::to_string));
    }

    lines.extend(doc.content_matrix.iter().map(matrix_line));
    lines.extend(
        doc.concepts
            .iter()
            .map(|c| format!("[{}] {}: {}", c.asset_id, c.title, c.description)),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn matrix_line(row: &MatrixRowExport) -> String {
    MATRIX_COLUMNS
        .iter()
        .zip(row.values())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// The matrix CSV download: header row plus comma-joined values, unquoted.
pub fn render_matrix_csv(rows: &[MatrixRowExport]) -> String {
    tabular::to_csv(&matrix_context(rows))
}

/// View the matrix as a tabular context keyed by [`MATRIX_COLUMNS`].
pub fn matrix_context(rows: &[MatrixRowExport]) -> TabularContext {
    TabularContext {
        headers: MATRIX_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| {
                MATRIX_COLUMNS
                    .iter()
                    .zip(r.values())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect(),
    }
}

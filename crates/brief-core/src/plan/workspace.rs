//! `brief.toml` workspace files: a saved plan document together with its
//! matrix rows and concepts.
//!
//! Loading validates that row ids and concept ids are unique. Concept
//! `asset_id` values that point at no row are accepted as-is.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document::PlanDocument;
use crate::store::{Concept, ContentStore, MatrixRow};
use crate::tabular::TabularContext;

/// Errors that can occur while reading or writing a workspace file.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("failed to access workspace file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("duplicate matrix row id: {0:?}")]
    DuplicateRowId(String),

    #[error("duplicate concept id: {0:?}")]
    DuplicateConceptId(String),

    #[error("matrix row at position {0} has an empty id")]
    EmptyRowId(usize),

    #[error("concept at position {0} has an empty id")]
    EmptyConceptId(usize),
}

/// Narrative section `[plan]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanSection {
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub single_minded_proposition: String,
    #[serde(default)]
    pub narrative_brief: String,
}

/// Top-level structure of a `brief.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    #[serde(default)]
    pub plan: PlanSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrix: Vec<MatrixRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<Concept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<TabularContext>,
}

impl Workspace {
    /// Capture the current document and store contents.
    pub fn capture(doc: &PlanDocument, store: &ContentStore) -> Self {
        Self {
            plan: PlanSection {
                campaign_name: doc.campaign_name.clone(),
                single_minded_proposition: doc.single_minded_proposition.clone(),
                narrative_brief: doc.narrative_brief.clone(),
            },
            matrix: store.rows().to_vec(),
            concepts: store.concepts().to_vec(),
            audience: doc.audience_context(),
        }
    }

    /// Split into a plan document and a store whose id counters are seeded
    /// past the loaded ids.
    pub fn into_parts(self) -> (PlanDocument, ContentStore) {
        let mut doc = PlanDocument {
            campaign_name: self.plan.campaign_name,
            single_minded_proposition: self.plan.single_minded_proposition,
            narrative_brief: self.plan.narrative_brief,
            ..PlanDocument::default()
        };
        if let Some(ctx) = self.audience {
            doc.replace_audience_context(ctx);
        }
        let store = ContentStore::from_parts(self.matrix, self.concepts);
        (doc, store)
    }

    pub fn to_toml(&self) -> Result<String, WorkspaceError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse and validate a workspace TOML string.
pub fn parse_workspace(content: &str) -> Result<Workspace, WorkspaceError> {
    let ws: Workspace = toml::from_str(content)?;
    validate(&ws)?;
    Ok(ws)
}

/// Read and validate a workspace file.
pub fn load_workspace(path: &Path) -> Result<Workspace, WorkspaceError> {
    let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_workspace(&content)
}

/// Serialize and write a workspace file.
pub fn save_workspace(path: &Path, ws: &Workspace) -> Result<(), WorkspaceError> {
    let content = ws.to_toml()?;
    std::fs::write(path, content).map_err(|source| WorkspaceError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn validate(ws: &Workspace) -> Result<(), WorkspaceError> {
    let mut seen = HashSet::new();
    for (i, row) in ws.matrix.iter().enumerate() {
        if row.id.is_empty() {
            return Err(WorkspaceError::EmptyRowId(i));
        }
        if !seen.insert(row.id.as_str()) {
            return Err(WorkspaceError::DuplicateRowId(row.id.clone()));
        }
    }

    let mut seen = HashSet::new();
    for (i, concept) in ws.concepts.iter().enumerate() {
        if concept.id.is_empty() {
            return Err(WorkspaceError::EmptyConceptId(i));
        }
        if !seen.insert(concept.id.as_str()) {
            return Err(WorkspaceError::DuplicateConceptId(concept.id.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_workspace() {
        let toml_str = r#"
[plan]
campaign_name = "Oat Milk Launch"
single_minded_proposition = "Creamy without the cow"
narrative_brief = """
Launch across three markets.
Lead with taste.
"""

[[matrix]]
id = "row-1"
audience_segment = "Flexitarians"
funnel_stage = "Awareness"
channel = "social"

[[matrix]]
id = "row-2"
message = "Try it in your coffee"

[[concepts]]
id = "concept-1"
asset_id = "row-1"
title = "Barista battle"

[audience]
headers = ["Segment", "Size"]
rows = [{ Segment = "Flexitarians", Size = "12M" }]
"#;
        let ws = parse_workspace(toml_str).expect("should parse");
        assert_eq!(ws.plan.campaign_name, "Oat Milk Launch");
        assert_eq!(ws.matrix.len(), 2);
        assert_eq!(ws.matrix[1].trigger, "");
        assert_eq!(ws.concepts[0].asset_id, "row-1");

        let (doc, mut store) = ws.into_parts();
        assert_eq!(doc.audience_headers.as_deref().map(|h| h.len()), Some(2));
        assert_eq!(store.add_row(), "row-3");
    }

    #[test]
    fn empty_workspace_is_valid() {
        let ws = parse_workspace("").expect("empty file is a blank workspace");
        assert_eq!(ws, Workspace::default());
    }

    #[test]
    fn rejects_duplicate_row_ids() {
        let toml_str = r#"
[[matrix]]
id = "row-1"

[[matrix]]
id = "row-1"
"#;
        let err = parse_workspace(toml_str).unwrap_err();
        assert!(
            matches!(err, WorkspaceError::DuplicateRowId(ref id) if id == "row-1"),
            "expected DuplicateRowId, got: {err}"
        );
    }

    #[test]
    fn rejects_duplicate_concept_ids() {
        let toml_str = r#"
[[concepts]]
id = "c"

[[concepts]]
id = "c"
"#;
        let err = parse_workspace(toml_str).unwrap_err();
        assert!(
            matches!(err, WorkspaceError::DuplicateConceptId(_)),
            "expected DuplicateConceptId, got: {err}"
        );
    }

    #[test]
    fn rejects_missing_row_id() {
        let toml_str = r#"
[[matrix]]
id = ""
"#;
        let err = parse_workspace(toml_str).unwrap_err();
        assert!(matches!(err, WorkspaceError::EmptyRowId(0)), "got: {err}");
    }

    #[test]
    fn dangling_asset_id_is_accepted() {
        let toml_str = r#"
[[concepts]]
id = "concept-1"
asset_id = "row-404"
"#;
        let ws = parse_workspace(toml_str).expect("dangling references are allowed");
        assert_eq!(ws.concepts[0].asset_id, "row-404");
    }

    #[test]
    fn capture_then_parse_roundtrip() {
        let mut store = ContentStore::new();
        store.add_row();
        store
            .update_cell(0, crate::store::MatrixField::Channel, "email")
            .unwrap();
        store.add_concept();
        let mut doc = PlanDocument::new("Roundtrip");
        doc.replace_audience_context(crate::tabular::parse("a,b\n1,2"));

        let ws = Workspace::capture(&doc, &store);
        let text = ws.to_toml().expect("should serialize");
        let back = parse_workspace(&text).expect("should parse");
        assert_eq!(back, ws);
    }

    #[test]
    fn save_and_load_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("brief.toml");
        let ws = Workspace {
            plan: PlanSection {
                campaign_name: "Saved".into(),
                ..PlanSection::default()
            },
            ..Workspace::default()
        };
        save_workspace(&path, &ws).unwrap();
        let loaded = load_workspace(&path).unwrap();
        assert_eq!(loaded.plan.campaign_name, "Saved");

        let missing = load_workspace(&tmp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, WorkspaceError::Io { .. }));
    }
}

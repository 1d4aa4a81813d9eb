//! Workspace file access and row/concept id resolution.
//!
//! - [`open_workspace`] loads `brief.toml` when present and starts empty
//!   otherwise; [`require_workspace`] insists the file exists.
//! - [`resolve_row`] / [`resolve_concept`] accept either a full id
//!   (`row-3`) or its bare number (`3`).

use std::path::Path;

use anyhow::{Context, Result, bail};

use brief_core::plan::{self, PlanDocument, Workspace};
use brief_core::store::{CONCEPT_ID_PREFIX, ContentStore, ROW_ID_PREFIX};

/// Default workspace file name in the current directory.
pub const DEFAULT_WORKSPACE: &str = "brief.toml";

/// Load a workspace, or start an empty one if the file does not exist yet.
pub fn open_workspace(path: &Path) -> Result<(PlanDocument, ContentStore)> {
    if !path.exists() {
        return Ok((PlanDocument::default(), ContentStore::new()));
    }
    require_workspace(path)
}

/// Load a workspace that must already exist.
pub fn require_workspace(path: &Path) -> Result<(PlanDocument, ContentStore)> {
    let ws = plan::load_workspace(path)
        .with_context(|| format!("failed to load workspace {}", path.display()))?;
    Ok(ws.into_parts())
}

/// Persist the document and store.
pub fn write_workspace(path: &Path, doc: &PlanDocument, store: &ContentStore) -> Result<()> {
    plan::save_workspace(path, &Workspace::capture(doc, store))
        .with_context(|| format!("failed to save workspace {}", path.display()))
}

/// Resolve a row reference to its current index.
pub fn resolve_row(store: &ContentStore, input: &str) -> Result<(usize, String)> {
    let id = normalize_id(input, ROW_ID_PREFIX);
    match store.row_index(&id) {
        Some(index) => Ok((index, id)),
        None => bail!("no matrix row {input:?} (use `/show` to list row ids)"),
    }
}

/// Resolve a concept reference to its current index.
pub fn resolve_concept(store: &ContentStore, input: &str) -> Result<(usize, String)> {
    let id = normalize_id(input, CONCEPT_ID_PREFIX);
    match store.concept_index(&id) {
        Some(index) => Ok((index, id)),
        None => bail!("no concept {input:?} (use `/show` to list concept ids)"),
    }
}

fn normalize_id(input: &str, prefix: &str) -> String {
    if input.parse::<u64>().is_ok() {
        format!("{prefix}{input}")
    } else {
        input.to_string()
    }
}

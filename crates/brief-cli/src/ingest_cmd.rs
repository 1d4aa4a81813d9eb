use std::path::Path;

use anyhow::Context;

use brief_core::assistant::UploadResponse;
use brief_core::tabular::TabularContext;

use crate::resolve;

/// Classify and ingest a file the way `/upload` does, printing the result as
/// JSON. With a workspace, a tabular file also replaces its audience context.
pub fn run_ingest(file: &Path, workspace: Option<&Path>) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let upload = UploadResponse::from_file(&filename, &String::from_utf8_lossy(&bytes));
    println!("{}", serde_json::to_string_pretty(&upload)?);

    let Some(workspace) = workspace else {
        return Ok(());
    };
    match upload {
        UploadResponse::AudienceMatrix { rows, headers, .. } => {
            let (mut doc, store) = resolve::open_workspace(workspace)?;
            let count = rows.len();
            doc.replace_audience_context(TabularContext { headers, rows });
            resolve::write_workspace(workspace, &doc, &store)?;
            eprintln!(
                "Audience context in {} replaced ({count} rows).",
                workspace.display()
            );
        }
        UploadResponse::Document { .. } => {
            eprintln!("{filename} is not tabular; workspace left unchanged.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_replaces_workspace_audience() {
        let tmp = tempfile::TempDir::new().unwrap();
        let workspace = tmp.path().join("brief.toml");
        let first = tmp.path().join("first.csv");
        let second = tmp.path().join("second.csv");
        std::fs::write(&first, "a,b\n1,2\n").unwrap();
        std::fs::write(&second, "Segment\nStudents\nParents\n").unwrap();

        run_ingest(&first, Some(&workspace)).unwrap();
        run_ingest(&second, Some(&workspace)).unwrap();

        let (doc, _) = resolve::require_workspace(&workspace).unwrap();
        assert_eq!(doc.audience_headers, Some(vec!["Segment".to_string()]));
        assert_eq!(doc.audience_matrix.map(|rows| rows.len()), Some(2));
    }

    #[test]
    fn text_file_leaves_workspace_alone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let workspace = tmp.path().join("brief.toml");
        let notes = tmp.path().join("notes.md");
        std::fs::write(&notes, "# ideas").unwrap();

        run_ingest(&notes, Some(&workspace)).unwrap();
        assert!(!workspace.exists());
    }
}

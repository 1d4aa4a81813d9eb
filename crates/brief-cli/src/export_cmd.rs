use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;

use brief_core::assistant::BackendClient;
use brief_core::export::{self, CanonicalDocument, ExportFormat};

use crate::config::BriefConfig;
use crate::resolve;

/// Export a workspace in the given format.
///
/// Local formats go to stdout unless `output` is given. PDF is rendered by
/// the backend and always written to a file.
pub async fn run_export(
    config: &BriefConfig,
    workspace: &Path,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (doc, store) = resolve::require_workspace(workspace)?;
    let canonical = export::assemble_snapshot(&doc, &store.snapshot());
    let bytes = render(config, &canonical, format).await?;

    let target = match output {
        Some(path) => Some(path.to_path_buf()),
        None if !format.is_local() => Some(default_output_path(
            &canonical,
            format,
            chrono::Local::now().date_naive(),
        )),
        None => None,
    };

    match target {
        Some(path) => {
            std::fs::write(&path, &bytes)
                .with_context(|| format!("cannot create output file: {}", path.display()))?;
            println!("Exported {format} ({} bytes) to {}", bytes.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Render locally, or through the backend for remote-only formats.
pub async fn render(
    config: &BriefConfig,
    canonical: &CanonicalDocument,
    format: ExportFormat,
) -> anyhow::Result<Vec<u8>> {
    if format.is_local() {
        return Ok(export::render(canonical, format)?);
    }
    let backend = BackendClient::new(&config.backend_url);
    backend
        .export(format, canonical)
        .await
        .with_context(|| format!("{format} export via {} failed", backend.base_url()))
}

/// `<campaign-slug>-<YYYY-MM-DD>.<ext>`, falling back to `brief` when the
/// campaign has no usable name.
pub fn default_output_path(doc: &CanonicalDocument, format: ExportFormat, date: NaiveDate) -> PathBuf {
    let slug = slugify(&doc.campaign_name);
    let stem = if slug.is_empty() { "brief" } else { slug.as_str() };
    PathBuf::from(format!(
        "{stem}-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    ))
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

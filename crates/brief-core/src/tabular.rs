//! Tabular ingestion: raw comma-delimited text into a [`TabularContext`].
//!
//! The parser is deliberately forgiving. It never fails; the worst case for
//! malformed input is an empty context. Quoting is not supported, so a comma
//! inside a value is always a delimiter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of rows quoted verbatim in an upload summary.
pub const SAMPLE_ROWS: usize = 3;

/// One ingested row: header name to cell value, in column order.
///
/// A header that repeats writes to the same key, so the later column's value
/// replaces the earlier one while keeping the first column's position.
pub type Row = IndexMap<String, String>;

/// Normalized header/row container produced by [`parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularContext {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Positional placeholder used for blank or missing headers.
pub fn placeholder_header(index: usize) -> String {
    format!("col_{index}")
}

/// Parse raw delimited text.
///
/// - Lines are split on `\n` / `\r\n`, right-trimmed, and empty lines are
///   discarded wherever they appear.
/// - The first surviving line is the header line. Blank headers become
///   `col_<i>`.
/// - Short lines leave trailing headers absent from the row; long lines
///   write extra cells under `col_<i>`.
/// - Rows whose present values are all empty are dropped.
pub fn parse(raw: &str) -> TabularContext {
    let mut lines = raw.lines().map(str::trim_end).filter(|l| !l.is_empty());

    let Some(header_line) = lines.next() else {
        return TabularContext::default();
    };

    let headers: Vec<String> = header_line
        .split(',')
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                placeholder_header(i)
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let mut row = Row::new();
        for (i, cell) in line.split(',').enumerate() {
            let key = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| placeholder_header(i));
            row.insert(key, cell.trim().to_string());
        }
        if row.values().any(|v| !v.is_empty()) {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    debug!(
        headers = headers.len(),
        rows = rows.len(),
        dropped,
        "parsed tabular input"
    );

    TabularContext { headers, rows }
}

/// Re-emit a context as comma-joined lines (header line first).
///
/// Absent trailing cells stay absent so that re-parsing the output yields the
/// same context. Values are written unquoted, mirroring [`parse`].
pub fn to_csv(ctx: &TabularContext) -> String {
    let mut out = String::new();
    if ctx.headers.is_empty() {
        return out;
    }
    out.push_str(&ctx.headers.join(","));
    out.push('\n');

    for row in &ctx.rows {
        let mut cells: Vec<Option<&str>> = ctx
            .headers
            .iter()
            .map(|h| row.get(h).map(String::as_str))
            .collect();
        while matches!(cells.last(), Some(None)) {
            cells.pop();
        }
        let mut line: Vec<&str> = cells.into_iter().map(|c| c.unwrap_or("")).collect();
        line.extend(
            row.iter()
                .filter(|(k, _)| !ctx.headers.contains(k))
                .map(|(_, v)| v.as_str()),
        );
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Whether an uploaded file should go through [`parse`].
pub fn looks_tabular(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".csv")
}

/// Build the synthetic chat turn describing an ingested file.
///
/// Contains the literal column list and a pretty JSON array of at most
/// [`SAMPLE_ROWS`] rows.
pub fn summarize(ctx: &TabularContext, filename: &str) -> String {
    let sample: Vec<&Row> = ctx.rows.iter().take(SAMPLE_ROWS).collect();
    let sample_json = serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string());
    format!(
        "I uploaded the file \"{filename}\" ({rows} rows).\n\
         Columns: {columns}\n\
         Sample rows:\n{sample_json}",
        rows = ctx.rows.len(),
        columns = ctx.headers.join(", "),
    )
}

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use cycif_db::headers::{HeaderKeyComparator, HeaderNormalizer, NormalizedHeader};
use cycif_db::markers::{ComparatorContext, MarkerRegistry};

#[derive(Serialize)]
struct HeaderRow {
    header: String,
    key: Option<String>,
    label: Option<String>,
    error: Option<String>,
}

/// Print the canonical key of every header in a cell table
pub fn run(registry: &MarkerRegistry, cells: PathBuf, labels: bool, json: bool) -> Result<()> {
    let mut reader = csv::Reader::from_path(&cells)
        .with_context(|| format!("Failed to open cell table: {}", cells.display()))?;
    let headers = reader
        .headers()
        .context("Failed to read cell table headers")?
        .clone();

    let normalizer = HeaderNormalizer::new(registry);
    let export = HeaderKeyComparator::new(registry, ComparatorContext::export());

    let mut rows = Vec::with_capacity(headers.len());
    for header in headers.iter().map(str::trim) {
        let row = match normalizer.normalize(header) {
            Ok(normalized) => {
                let label = match (&normalized, labels) {
                    (NormalizedHeader::Marker(key), true) => Some(export.label(key)?),
                    _ => None,
                };
                HeaderRow {
                    header: header.to_string(),
                    key: Some(normalized.to_string()),
                    label,
                    error: None,
                }
            }
            Err(e) => HeaderRow {
                header: header.to_string(),
                key: None,
                label: None,
                error: Some(e.to_string()),
            },
        };
        rows.push(row);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = rows.iter().map(|r| r.header.len()).max().unwrap_or(0);
    for row in &rows {
        match (&row.key, &row.error) {
            (Some(key), _) => {
                print!("{:width$}  {}", row.header, key, width = width);
                if let Some(label) = &row.label {
                    print!("  {}", label);
                }
                println!();
            }
            (None, Some(error)) => println!("{:width$}  ! {}", row.header, error, width = width),
            (None, None) => println!("{}", row.header),
        }
    }

    Ok(())
}

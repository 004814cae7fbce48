use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use cycif_db::compat::{register_unknown, CompatibilityChecker};
use cycif_db::ingest::DeclaredMarker;
use cycif_db::markers::MarkerRegistry;

/// Check a cell table and its declared markers against the registry.
///
/// With `update` set, unknown names are written to a registry snapshot
/// (at the given path, or next to the registry) instead of failing.
pub fn run(
    registry: &mut MarkerRegistry,
    cells: PathBuf,
    markers: Option<PathBuf>,
    update: Option<Option<PathBuf>>,
) -> Result<()> {
    info!("Compatibility check");
    info!("Cells: {}", cells.display());

    let mut reader = csv::Reader::from_path(&cells)
        .with_context(|| format!("Failed to open cell table: {}", cells.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read cell table headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let declared: Vec<String> = match &markers {
        Some(path) => DeclaredMarker::from_path(path)
            .with_context(|| format!("Failed to read declared markers: {}", path.display()))?
            .into_iter()
            .map(|m| m.marker_name)
            .collect(),
        None => Vec::new(),
    };

    let report = CompatibilityChecker::new(&*registry)
        .inspect(&headers, &declared)
        .named(cells.display().to_string());

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }

    if !report.has_failures() {
        return Ok(());
    }

    let Some(output) = update else {
        std::process::exit(1);
    };
    let written = register_unknown(registry, &report.unknown, output.as_deref(), false)
        .context("Failed to update marker registry")?;
    println!(
        "Registry snapshot with {} unknown name(s) written to {}",
        report.unknown.total(),
        written.display()
    );

    Ok(())
}

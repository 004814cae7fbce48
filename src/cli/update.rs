use anyhow::{Context, Result};
use std::path::PathBuf;

use cycif_db::markers::{MarkerRegistry, NewMarker};

/// Merge a registry-format TSV of additions and write a snapshot
pub fn run(registry: &mut MarkerRegistry, additions: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let additions_registry = MarkerRegistry::load(&additions)
        .with_context(|| format!("Failed to read additions: {}", additions.display()))?;

    let new_markers: Vec<NewMarker> = additions_registry
        .markers()
        .iter()
        .map(NewMarker::from)
        .collect();

    let written = registry
        .update(
            &new_markers,
            additions_registry.other_features(),
            output.as_deref(),
            false,
        )
        .context("Failed to update marker registry")?;

    println!(
        "Merged {} markers and {} features into {}",
        new_markers.len(),
        additions_registry.other_features().len(),
        written.display()
    );

    Ok(())
}

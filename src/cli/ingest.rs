use anyhow::{Context, Result};
use std::path::PathBuf;

use cycif_db::headers::HeaderKey;
use cycif_db::ingest::{
    export_columns, CellTable, DeclaredMarker, IngestOptions, Ingestor, MemorySink, SampleRecord,
};
use cycif_db::markers::MarkerRegistry;

/// Inputs of one ingestion run
pub struct IngestArgs {
    pub cells: PathBuf,
    pub markers: PathBuf,
    pub name: String,
    pub tag: Option<String>,
    pub annotation: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

/// Ingest a sample complex into an in-memory store and print the summary
pub fn run(registry: &MarkerRegistry, options: IngestOptions, args: IngestArgs) -> Result<()> {
    let cells = CellTable::from_path(&args.cells)
        .with_context(|| format!("Failed to read cell table: {}", args.cells.display()))?;
    let declared = DeclaredMarker::from_path(&args.markers)
        .with_context(|| format!("Failed to read declared markers: {}", args.markers.display()))?;

    let mut sample = SampleRecord::new(&args.name);
    sample.tag = args.tag;
    sample.annotation = args.annotation;

    let ingestor = Ingestor::new(registry, options);
    let mut sink = MemorySink::new();
    let summary = ingestor
        .ingest_sample_complex(&mut sink, sample, &cells, &declared, args.dry_run)
        .context("Ingestion failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Sample id:            {}", summary.sample_id);
    println!("Cells:                {}", summary.cells_inserted);
    println!("Marker associations:  {}", summary.marker_associations);
    println!("Committed:            {}", summary.committed);
    if !summary.undeclared_markers.is_empty() {
        println!(
            "Undeclared markers:   {}",
            summary.undeclared_markers.join(", ")
        );
    }

    let keys: Vec<HeaderKey> = summary
        .feature_list
        .iter()
        .filter_map(|k| k.parse().ok())
        .collect();
    let columns = export_columns(ingestor.schema(), &keys, registry)?;
    println!();
    println!("Export columns:");
    for column in columns {
        println!("  {}", column);
    }

    Ok(())
}

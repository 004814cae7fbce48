//! # Sample Ingestion
//!
//! Moves one sample complex (sample record, cell quantification table and
//! declared marker list) into an [`IngestSink`].
//!
//! ## Workflow
//!
//! 1. **Gate**: the headers and declared markers must pass
//!    [`CompatibilityChecker`](crate::compat::CompatibilityChecker)
//! 2. **Uniqueness**: no stored sample may share the name and tag
//! 3. **Write**: sample, chunked cell rows and sample-marker rows go into
//!    one unit of work
//! 4. **Finish**: commit, or roll back for dry runs and on any error
//!
//! Cell rows keep other features in typed columns described by
//! [`FeatureSchema`] and marker measurements in a map keyed by canonical
//! key (`"56_cl"`).

mod error;
mod schema;
mod sink;
mod table;
mod workflow;

#[cfg(test)]
mod tests;

pub use error::{IngestError, SinkError, TableError};
pub use schema::{
    column_sort_key, export_columns, round_to, FeatureSchema, FeatureType, FeatureValue,
    NUMERIC_PRECISION, NUMERIC_SCALE, SAMPLE_CELL_ID,
};
pub use sink::{CellRow, IngestSink, MemorySink, SampleId, SampleMarkerRow, SamplePredicate, SampleRecord};
pub use table::{CellTable, DeclaredMarker};
pub use workflow::{IngestOptions, IngestSummary, Ingestor, DEFAULT_CHUNK_SIZE, DEFAULT_DECIMALS};

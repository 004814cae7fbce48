use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::{round_to, FeatureSchema, FeatureValue, SAMPLE_CELL_ID};
use super::{
    CellRow, CellTable, DeclaredMarker, IngestError, IngestSink, SampleId, SampleMarkerRow,
    SamplePredicate, SampleRecord,
};
use crate::compat::CompatibilityChecker;
use crate::headers::{HeaderNormalizer, NormalizedHeader};
use crate::markers::MarkerRegistry;

/// Default number of cell rows per bulk insert
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Default rounding of marker measurements
pub const DEFAULT_DECIMALS: u32 = 4;

/// Tuning for [`Ingestor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Cell rows per bulk insert
    pub chunk_size: usize,
    /// Decimal places kept for marker measurements
    pub decimals: u32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            decimals: DEFAULT_DECIMALS,
        }
    }
}

/// What one ingestion wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Id assigned to the sample
    pub sample_id: SampleId,
    /// Canonical keys of the cell table columns
    pub feature_list: Vec<String>,
    /// Cell rows written
    pub cells_inserted: usize,
    /// Sample-marker associations written
    pub marker_associations: usize,
    /// Header markers missing from the declared list
    pub undeclared_markers: Vec<String>,
    /// False for dry runs
    pub committed: bool,
}

/// Writes one sample with its cells and declared markers as a single unit
#[derive(Debug, Clone)]
pub struct Ingestor<'a> {
    registry: &'a MarkerRegistry,
    options: IngestOptions,
    schema: FeatureSchema,
}

impl<'a> Ingestor<'a> {
    /// Create an ingestor over a registry
    pub fn new(registry: &'a MarkerRegistry, options: IngestOptions) -> Self {
        Self {
            registry,
            options,
            schema: FeatureSchema::from_registry(registry),
        }
    }

    /// Options in use
    pub fn options(&self) -> IngestOptions {
        self.options
    }

    /// Feature schema derived from the registry
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Ingest a sample complex: the sample, its cell table and its declared
    /// markers.
    ///
    /// The dataset is gated first, so incompatible input never reaches the
    /// sink. All writes then happen in one unit of work that is committed,
    /// or rolled back when `dry_run` is set or anything fails.
    pub fn ingest_sample_complex<S: IngestSink + ?Sized>(
        &self,
        sink: &mut S,
        sample: SampleRecord,
        cells: &CellTable,
        declared: &[DeclaredMarker],
        dry_run: bool,
    ) -> Result<IngestSummary, IngestError> {
        if self.options.chunk_size == 0 {
            return Err(IngestError::InvalidArgument(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        let declared_names: Vec<&str> = declared.iter().map(|d| d.marker_name.as_str()).collect();
        let report = CompatibilityChecker::new(self.registry).check(cells.headers(), &declared_names)?;

        let existing = sink.find_samples(&SamplePredicate::name_tag(
            &sample.name,
            sample.tag.as_deref(),
        ))?;
        if !existing.is_empty() {
            return Err(IngestError::SampleExists {
                name: sample.name,
                tag: sample.tag,
            });
        }

        sink.begin()?;
        let mut summary = match self.write_unit(sink, sample, cells, declared) {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(rollback) = sink.rollback() {
                    warn!("Rollback after failed ingestion also failed: {}", rollback);
                }
                return Err(e);
            }
        };
        summary.undeclared_markers = report.undeclared;

        if dry_run {
            sink.rollback()?;
            info!(
                "Dry run for sample {} finished; {} cells rolled back",
                summary.sample_id, summary.cells_inserted
            );
        } else {
            sink.commit()?;
            summary.committed = true;
            info!(
                "Added sample {} with {} cells and {} markers",
                summary.sample_id, summary.cells_inserted, summary.marker_associations
            );
        }
        Ok(summary)
    }

    fn write_unit<S: IngestSink + ?Sized>(
        &self,
        sink: &mut S,
        mut sample: SampleRecord,
        cells: &CellTable,
        declared: &[DeclaredMarker],
    ) -> Result<IngestSummary, IngestError> {
        let normalizer = HeaderNormalizer::new(self.registry);
        let columns = cells
            .headers()
            .iter()
            .map(|h| normalizer.normalize(h))
            .collect::<Result<Vec<_>, _>>()?;

        sample.feature_list = columns.iter().map(ToString::to_string).collect();
        let feature_list = sample.feature_list.clone();
        let sample_id = sink.insert_sample(&sample)?;
        info!("Added sample `{}` as {}", sample.name, sample_id);

        let mut cells_inserted = 0;
        for chunk in cells.rows().chunks(self.options.chunk_size) {
            let rows = chunk
                .iter()
                .map(|values| self.build_cell(sample_id, &columns, values))
                .collect::<Result<Vec<_>, _>>()?;
            let n = sink.insert_cells(rows)?;
            debug!("Added {} cell records", n);
            cells_inserted += n;
        }

        let associations = declared
            .iter()
            .map(|d| {
                let marker_id = self
                    .registry
                    .resolve_marker(&d.marker_name)
                    .ok_or_else(|| IngestError::UnknownDeclaredMarker(d.marker_name.clone()))?;
                Ok(SampleMarkerRow {
                    sample_id,
                    marker_id,
                    channel_number: d.channel_number,
                    cycle_number: d.cycle_number,
                    filter: d.filter.clone(),
                    excitation_wavelength: d.excitation_wavelength,
                    emission_wavelength: d.emission_wavelength,
                })
            })
            .collect::<Result<Vec<_>, IngestError>>()?;
        let marker_associations = sink.insert_sample_markers(associations)?;
        debug!("Added {} sample marker associations", marker_associations);

        Ok(IngestSummary {
            sample_id,
            feature_list,
            cells_inserted,
            marker_associations,
            undeclared_markers: Vec::new(),
            committed: false,
        })
    }

    fn build_cell(
        &self,
        sample_id: SampleId,
        columns: &[NormalizedHeader],
        values: &[Option<f64>],
    ) -> Result<CellRow, IngestError> {
        let mut row = CellRow {
            sample_id,
            sample_cell_id: None,
            others: BTreeMap::new(),
            features: serde_json::Map::new(),
        };

        for (column, value) in columns.iter().zip(values) {
            match column {
                NormalizedHeader::Marker(key) => {
                    let json = value
                        .map(|v| round_to(v, self.options.decimals))
                        .and_then(serde_json::Number::from_f64)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number);
                    row.features.insert(key.to_string(), json);
                }
                NormalizedHeader::Feature(name) => {
                    let Some(value) = value else {
                        continue;
                    };
                    match self.schema.coerce(name, *value)? {
                        FeatureValue::Integer(id) if name == SAMPLE_CELL_ID => {
                            row.sample_cell_id = Some(id);
                        }
                        coerced => {
                            row.others.insert(name.clone(), coerced);
                        }
                    }
                }
            }
        }
        Ok(row)
    }
}

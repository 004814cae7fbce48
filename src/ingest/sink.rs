use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{FeatureValue, SinkError};
use crate::markers::MarkerId;

/// Identity assigned to a stored sample
pub type SampleId = u64;

/// A sample to be stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    /// Sample name, unique together with the tag
    pub name: String,
    /// Optional tag distinguishing runs of the same sample
    pub tag: Option<String>,
    /// Free-text annotation
    pub annotation: Option<String>,
    /// Canonical keys of the cell table columns, in table order
    pub feature_list: Vec<String>,
    /// When the record was created
    pub entry_at: DateTime<Utc>,
}

impl SampleRecord {
    /// Create a sample record stamped with the current time
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: None,
            annotation: None,
            feature_list: Vec::new(),
            entry_at: Utc::now(),
        }
    }

    /// Set the tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Set the annotation
    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotation = Some(annotation.to_string());
        self
    }
}

/// One cell: its typed feature columns plus the marker feature map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRow {
    /// Owning sample
    pub sample_id: SampleId,
    /// Id of the cell within its sample
    pub sample_cell_id: Option<i64>,
    /// Other feature columns by canonical name
    pub others: BTreeMap<String, FeatureValue>,
    /// Marker measurements keyed by canonical key (`"56_cl"`)
    pub features: serde_json::Map<String, serde_json::Value>,
}

/// Association between a sample and a marker it was stained for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleMarkerRow {
    /// Owning sample
    pub sample_id: SampleId,
    /// Registry id of the marker
    pub marker_id: MarkerId,
    /// Imaging channel
    pub channel_number: Option<i64>,
    /// Staining cycle
    pub cycle_number: Option<i64>,
    /// Optical filter
    pub filter: Option<String>,
    /// Excitation wavelength in nm
    pub excitation_wavelength: Option<f64>,
    /// Emission wavelength in nm
    pub emission_wavelength: Option<f64>,
}

/// Sample lookup predicates a sink must answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePredicate {
    /// Case-insensitive exact match on name and tag
    NameTag {
        /// Sample name
        name: String,
        /// Sample tag; `None` only matches untagged samples
        tag: Option<String>,
    },
    /// Case-insensitive substring of name or tag
    Contains(String),
}

impl SamplePredicate {
    /// Exact name/tag predicate
    pub fn name_tag(name: &str, tag: Option<&str>) -> Self {
        SamplePredicate::NameTag {
            name: name.to_string(),
            tag: tag.map(str::to_string),
        }
    }

    /// Whether a sample satisfies the predicate
    pub fn matches(&self, sample: &SampleRecord) -> bool {
        match self {
            SamplePredicate::NameTag { name, tag } => {
                fold(&sample.name) == fold(name)
                    && match (&sample.tag, tag) {
                        (None, None) => true,
                        (Some(a), Some(b)) => fold(a) == fold(b),
                        _ => false,
                    }
            }
            SamplePredicate::Contains(query) => {
                let query = fold(query);
                fold(&sample.name).contains(&query)
                    || sample
                        .tag
                        .as_ref()
                        .is_some_and(|t| fold(t).contains(&query))
            }
        }
    }
}

/// Case folding shared by every sample predicate
fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// The store ingestion writes into.
///
/// Writes happen inside a unit of work opened by [`IngestSink::begin`] and
/// closed by [`IngestSink::commit`] or [`IngestSink::rollback`]; a rolled
/// back unit leaves no trace.
pub trait IngestSink {
    /// Open a unit of work
    fn begin(&mut self) -> Result<(), SinkError>;

    /// Store a sample and return its assigned id
    fn insert_sample(&mut self, sample: &SampleRecord) -> Result<SampleId, SinkError>;

    /// Bulk insert cell rows, returning the number stored
    fn insert_cells(&mut self, rows: Vec<CellRow>) -> Result<usize, SinkError>;

    /// Bulk insert sample-marker associations, returning the number stored
    fn insert_sample_markers(&mut self, rows: Vec<SampleMarkerRow>) -> Result<usize, SinkError>;

    /// Samples matching a predicate, including ones in the open unit of work
    fn find_samples(
        &self,
        predicate: &SamplePredicate,
    ) -> Result<Vec<(SampleId, SampleRecord)>, SinkError>;

    /// Make the open unit of work permanent
    fn commit(&mut self) -> Result<(), SinkError>;

    /// Discard the open unit of work. A no-op when none is open.
    fn rollback(&mut self) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Default)]
struct Tables {
    samples: Vec<(SampleId, SampleRecord)>,
    cells: Vec<CellRow>,
    sample_markers: Vec<SampleMarkerRow>,
}

impl Tables {
    fn append(&mut self, other: Tables) {
        self.samples.extend(other.samples);
        self.cells.extend(other.cells);
        self.sample_markers.extend(other.sample_markers);
    }
}

/// In-memory [`IngestSink`], used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    committed: Tables,
    pending: Option<Tables>,
    next_id: SampleId,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a unit of work is open
    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Committed samples
    pub fn samples(&self) -> &[(SampleId, SampleRecord)] {
        &self.committed.samples
    }

    /// Committed cell rows
    pub fn cells(&self) -> &[CellRow] {
        &self.committed.cells
    }

    /// Committed sample-marker associations
    pub fn sample_markers(&self) -> &[SampleMarkerRow] {
        &self.committed.sample_markers
    }

    /// Committed cells of one sample
    pub fn cells_for_sample(&self, sample_id: SampleId) -> impl Iterator<Item = &CellRow> {
        self.committed
            .cells
            .iter()
            .filter(move |c| c.sample_id == sample_id)
    }

    fn pending_mut(&mut self) -> Result<&mut Tables, SinkError> {
        self.pending.as_mut().ok_or(SinkError::NoTransaction)
    }
}

impl IngestSink for MemorySink {
    fn begin(&mut self) -> Result<(), SinkError> {
        if self.pending.is_some() {
            return Err(SinkError::TransactionActive);
        }
        self.pending = Some(Tables::default());
        Ok(())
    }

    fn insert_sample(&mut self, sample: &SampleRecord) -> Result<SampleId, SinkError> {
        let id = self.next_id + 1;
        self.pending_mut()?.samples.push((id, sample.clone()));
        // Ids are never reused, even after a rollback
        self.next_id = id;
        Ok(id)
    }

    fn insert_cells(&mut self, rows: Vec<CellRow>) -> Result<usize, SinkError> {
        let count = rows.len();
        self.pending_mut()?.cells.extend(rows);
        Ok(count)
    }

    fn insert_sample_markers(&mut self, rows: Vec<SampleMarkerRow>) -> Result<usize, SinkError> {
        let count = rows.len();
        self.pending_mut()?.sample_markers.extend(rows);
        Ok(count)
    }

    fn find_samples(
        &self,
        predicate: &SamplePredicate,
    ) -> Result<Vec<(SampleId, SampleRecord)>, SinkError> {
        let pending = self.pending.iter().flat_map(|t| t.samples.iter());
        Ok(self
            .committed
            .samples
            .iter()
            .chain(pending)
            .filter(|(_, sample)| predicate.matches(sample))
            .cloned()
            .collect())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        let pending = self.pending.take().ok_or(SinkError::NoTransaction)?;
        self.committed.append(pending);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SinkError> {
        self.pending = None;
        Ok(())
    }
}

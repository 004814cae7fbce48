use super::*;
use crate::compat::CompatibilityError;
use crate::headers::HeaderKey;
use crate::test_support::sample_registry;
use serde_json::json;

const CELLS: &str = "\
CellID,CD45_1_Cell Masks,Area,DAPI_1_Nuclei Masks
1,10.123456,5,200.5
2,,7,180
3,3.00004,6.25,190.12346
";

const DECLARED: &str = "\
Marker_Name,Channel_Number,Cycle_Number,Filter
CD45,2,1,FITC
DAPI,1,1,
";

fn cells() -> CellTable {
    CellTable::from_reader(CELLS.as_bytes()).unwrap()
}

fn declared() -> Vec<DeclaredMarker> {
    DeclaredMarker::read_csv(DECLARED.as_bytes()).unwrap()
}

/// Sink wrapper recording chunk sizes and optionally failing cell inserts
#[derive(Default)]
struct ProbeSink {
    inner: MemorySink,
    chunks: Vec<usize>,
    fail_cells: bool,
}

impl IngestSink for ProbeSink {
    fn begin(&mut self) -> Result<(), SinkError> {
        self.inner.begin()
    }

    fn insert_sample(&mut self, sample: &SampleRecord) -> Result<SampleId, SinkError> {
        self.inner.insert_sample(sample)
    }

    fn insert_cells(&mut self, rows: Vec<CellRow>) -> Result<usize, SinkError> {
        if self.fail_cells {
            return Err(SinkError::Rejected("disk full".to_string()));
        }
        self.chunks.push(rows.len());
        self.inner.insert_cells(rows)
    }

    fn insert_sample_markers(&mut self, rows: Vec<SampleMarkerRow>) -> Result<usize, SinkError> {
        self.inner.insert_sample_markers(rows)
    }

    fn find_samples(
        &self,
        predicate: &SamplePredicate,
    ) -> Result<Vec<(SampleId, SampleRecord)>, SinkError> {
        self.inner.find_samples(predicate)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), SinkError> {
        self.inner.rollback()
    }
}

#[test]
fn test_feature_schema_from_registry() {
    let registry = sample_registry();
    let schema = FeatureSchema::from_registry(&registry);

    assert_eq!(schema.len(), 4);
    assert_eq!(schema.get(SAMPLE_CELL_ID), Some(FeatureType::Integer));
    assert_eq!(
        schema.get("area"),
        Some(FeatureType::Numeric {
            precision: 15,
            scale: 4
        })
    );
    assert_eq!(schema.get("volume"), None);
    assert_eq!(
        schema.sorted_columns(),
        vec!["sample_cell_id", "area", "x_centroid", "y_centroid"]
    );
    assert_eq!(schema.get("area").unwrap().to_string(), "NUMERIC(15, 4)");
}

#[test]
fn test_coerce() {
    let registry = sample_registry();
    let schema = FeatureSchema::from_registry(&registry);

    assert_eq!(
        schema.coerce("area", 1.23456).unwrap(),
        FeatureValue::Numeric(1.2346)
    );
    assert_eq!(
        schema.coerce(SAMPLE_CELL_ID, 12.9).unwrap(),
        FeatureValue::Integer(12)
    );
    assert!(matches!(
        schema.coerce("volume", 1.0),
        Err(IngestError::UnknownColumn(_))
    ));
    assert!(matches!(
        schema.coerce(SAMPLE_CELL_ID, f64::NAN),
        Err(IngestError::InvalidValue { .. })
    ));
    assert!(matches!(
        schema.coerce("area", 1e12),
        Err(IngestError::InvalidValue { .. })
    ));
}

#[test]
fn test_column_sort_key() {
    let mut columns = vec!["x_centroid", "cd45__cell_masks", "area", "sample_cell_id"];
    columns.sort_by_key(|c| column_sort_key(*c));
    assert_eq!(
        columns,
        vec!["sample_cell_id", "cd45__cell_masks", "area", "x_centroid"]
    );
}

#[test]
fn test_export_columns() {
    let registry = sample_registry();
    let schema = FeatureSchema::from_registry(&registry);
    let keys: Vec<HeaderKey> = ["105_nu", "10004_cl", "56_cl"]
        .iter()
        .map(|k| k.parse().unwrap())
        .collect();

    let columns = export_columns(&schema, &keys, &registry).unwrap();
    assert_eq!(
        columns,
        vec![
            "sample_name",
            "sample_tag",
            "sample_cell_id",
            "area",
            "x_centroid",
            "y_centroid",
            "CD1000_goat__cell_masks",
            "CD45__cell_masks",
            "DAPI__nuclei_masks",
        ]
    );
}

#[test]
fn test_cell_table_parsing() {
    let table = cells();
    assert_eq!(table.headers().len(), 4);
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[1][1], None);
    assert_eq!(table.rows()[0][0], Some(1.0));

    let err = CellTable::from_reader("CellID,Area\n1,abc\n".as_bytes()).unwrap_err();
    match err {
        TableError::InvalidNumber { column, value, .. } => {
            assert_eq!(column, "Area");
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = CellTable::new(vec!["a".into(), "b".into()], vec![vec![Some(1.0)]]).unwrap_err();
    assert!(matches!(
        err,
        TableError::RowLength {
            row: 0,
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn test_declared_markers() {
    let markers = declared();
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].marker_name, "CD45");
    assert_eq!(markers[0].channel_number, Some(2));
    assert_eq!(markers[0].filter.as_deref(), Some("FITC"));
    assert_eq!(markers[1].filter, None);
    assert_eq!(markers[1].emission_wavelength, None);

    let err = DeclaredMarker::read_csv("name,channel\nCD45,1\n".as_bytes()).unwrap_err();
    assert!(matches!(err, TableError::MissingColumn(_)));
}

#[test]
fn test_sample_predicates() {
    let sample = SampleRecord::new("Tonsil_01").with_tag("Batch A");
    assert!(SamplePredicate::name_tag("tonsil_01", Some("batch a")).matches(&sample));
    assert!(!SamplePredicate::name_tag("tonsil_01", None).matches(&sample));
    assert!(!SamplePredicate::name_tag("tonsil", Some("batch a")).matches(&sample));
    assert!(SamplePredicate::Contains("SIL".into()).matches(&sample));
    assert!(SamplePredicate::Contains("batch".into()).matches(&sample));
    assert!(!SamplePredicate::Contains("lung".into()).matches(&sample));

    let untagged = SampleRecord::new("Lung");
    assert!(SamplePredicate::name_tag("LUNG", None).matches(&untagged));
}

#[test]
fn test_sample_predicates_fold_non_ascii() {
    let sample = SampleRecord::new("MÜNCHEN_Ä1").with_tag("Ärzte");
    assert!(SamplePredicate::name_tag("münchen_ä1", Some("ÄRZTE")).matches(&sample));
    assert!(SamplePredicate::Contains("müNCH".into()).matches(&sample));
    assert!(SamplePredicate::Contains("ärz".into()).matches(&sample));
}

#[test]
fn test_memory_sink_units_of_work() {
    let mut sink = MemorySink::new();
    let sample = SampleRecord::new("s1");

    assert!(matches!(
        sink.insert_sample(&sample),
        Err(SinkError::NoTransaction)
    ));

    sink.begin().unwrap();
    assert!(matches!(sink.begin(), Err(SinkError::TransactionActive)));
    let first = sink.insert_sample(&sample).unwrap();
    assert_eq!(
        sink.find_samples(&SamplePredicate::Contains("s1".into()))
            .unwrap()
            .len(),
        1
    );
    sink.rollback().unwrap();
    assert!(sink.samples().is_empty());
    assert!(!sink.in_transaction());

    sink.begin().unwrap();
    let second = sink.insert_sample(&sample).unwrap();
    sink.commit().unwrap();
    assert_ne!(first, second);
    assert_eq!(sink.samples().len(), 1);
    assert!(matches!(sink.commit(), Err(SinkError::NoTransaction)));
}

#[test]
fn test_ingest_sample_complex() {
    let registry = sample_registry();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = MemorySink::new();

    let summary = ingestor
        .ingest_sample_complex(
            &mut sink,
            SampleRecord::new("Tonsil").with_tag("run1"),
            &cells(),
            &declared(),
            false,
        )
        .unwrap();

    assert!(summary.committed);
    assert_eq!(summary.cells_inserted, 3);
    assert_eq!(summary.marker_associations, 2);
    assert!(summary.undeclared_markers.is_empty());
    assert_eq!(
        summary.feature_list,
        vec!["sample_cell_id", "56_cl", "area", "105_nu"]
    );

    let (id, stored) = &sink.samples()[0];
    assert_eq!(*id, summary.sample_id);
    assert_eq!(stored.feature_list, summary.feature_list);

    let rows: Vec<&CellRow> = sink.cells_for_sample(summary.sample_id).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].sample_cell_id, Some(1));
    assert_eq!(rows[0].features["56_cl"], json!(10.1235));
    assert_eq!(rows[0].features["105_nu"], json!(200.5));
    assert_eq!(rows[0].others["area"], FeatureValue::Numeric(5.0));
    assert_eq!(rows[1].features["56_cl"], serde_json::Value::Null);
    assert_eq!(rows[2].features["56_cl"], json!(3.0));
    assert_eq!(rows[2].features["105_nu"], json!(190.1235));

    let markers: Vec<_> = sink.sample_markers().iter().map(|m| m.marker_id).collect();
    assert_eq!(markers, vec![56, 105]);
    assert_eq!(sink.sample_markers()[0].cycle_number, Some(1));
}

#[test]
fn test_dry_run_rolls_back() {
    let registry = sample_registry();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = MemorySink::new();

    let summary = ingestor
        .ingest_sample_complex(&mut sink, SampleRecord::new("Tonsil"), &cells(), &declared(), true)
        .unwrap();

    assert!(!summary.committed);
    assert_eq!(summary.cells_inserted, 3);
    assert!(sink.samples().is_empty());
    assert!(sink.cells().is_empty());
    assert!(!sink.in_transaction());
}

#[test]
fn test_existing_sample_rejected() {
    let registry = sample_registry();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = MemorySink::new();

    ingestor
        .ingest_sample_complex(
            &mut sink,
            SampleRecord::new("Tonsil").with_tag("run1"),
            &cells(),
            &declared(),
            false,
        )
        .unwrap();

    let err = ingestor
        .ingest_sample_complex(
            &mut sink,
            SampleRecord::new("TONSIL").with_tag("RUN1"),
            &cells(),
            &declared(),
            false,
        )
        .unwrap_err();
    assert!(matches!(err, IngestError::SampleExists { .. }));
    assert_eq!(sink.samples().len(), 1);
    assert_eq!(sink.cells().len(), 3);

    // A different tag is a different sample
    ingestor
        .ingest_sample_complex(
            &mut sink,
            SampleRecord::new("Tonsil").with_tag("run2"),
            &cells(),
            &declared(),
            false,
        )
        .unwrap();
    assert_eq!(sink.samples().len(), 2);
}

#[test]
fn test_incompatible_dataset_never_writes() {
    let registry = sample_registry();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = MemorySink::new();
    let table = CellTable::from_reader("CellID,FOO_Cell Masks\n1,2\n".as_bytes()).unwrap();

    let err = ingestor
        .ingest_sample_complex(&mut sink, SampleRecord::new("s"), &table, &declared(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Compatibility(CompatibilityError::Incompatible(_))
    ));
    assert!(!sink.in_transaction());
    assert!(sink.samples().is_empty());
}

#[test]
fn test_sink_failure_rolls_back() {
    let registry = sample_registry();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = ProbeSink {
        fail_cells: true,
        ..Default::default()
    };

    let err = ingestor
        .ingest_sample_complex(&mut sink, SampleRecord::new("s"), &cells(), &declared(), false)
        .unwrap_err();
    assert!(matches!(err, IngestError::Sink(SinkError::Rejected(_))));
    assert!(!sink.inner.in_transaction());
    assert!(sink.inner.samples().is_empty());
}

#[test]
fn test_chunked_inserts() {
    let registry = sample_registry();
    let options = IngestOptions {
        chunk_size: 2,
        decimals: 2,
    };
    let ingestor = Ingestor::new(&registry, options);
    let mut sink = ProbeSink::default();

    let summary = ingestor
        .ingest_sample_complex(&mut sink, SampleRecord::new("s"), &cells(), &declared(), false)
        .unwrap();
    assert_eq!(sink.chunks, vec![2, 1]);
    assert_eq!(summary.cells_inserted, 3);
    assert_eq!(sink.inner.cells()[0].features["56_cl"], json!(10.12));
}

#[test]
fn test_zero_chunk_size() {
    let registry = sample_registry();
    let options = IngestOptions {
        chunk_size: 0,
        ..Default::default()
    };
    let ingestor = Ingestor::new(&registry, options);
    let mut sink = MemorySink::new();
    let err = ingestor
        .ingest_sample_complex(&mut sink, SampleRecord::new("s"), &cells(), &declared(), false)
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidArgument(_)));
}

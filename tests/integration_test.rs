//! Integration tests for cycif-db
//!
//! These tests run the full path from a registry file on disk through
//! normalization, gating, fusion and ingestion.

use cycif_db::compat::{CompatibilityChecker, CompatibilityError};
use cycif_db::fusion::{fuse_db_keys, FuseMode};
use cycif_db::headers::{HeaderKey, HeaderKeyComparator, HeaderNormalizer, MaskType};
use cycif_db::ingest::{
    CellTable, DeclaredMarker, IngestOptions, Ingestor, MemorySink, SampleRecord,
};
use cycif_db::markers::{ComparatorContext, Identity, MarkerRegistry, NewMarker, OtherFeature};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const REGISTRY: &str = "\
# Stock markers
kind\tid\tname\tfluor\tanti\tduplicate\taliases
marker\t56\tCD45\t\t\t\tCD45_1,CD-45
marker\t105\tDAPI\t\t\t\tDAPI_1,DAPI1
marker\t7\talpha_SMA\t\t\t\taSMA,alpha-SMA
marker\t10001\tCD1000\t\t\t\t
marker\t10002\tCD1000\tef570\t\t\t
marker\t10004\tCD1000\t\tgoat\t\t
marker\t10005\tCD1000\t\t\t1\t
other\t\tsample_cell_id\t\t\t\tcellID,CellId
other\t\tarea\t\t\t\tArea
";

fn write_registry(dir: &Path) -> PathBuf {
    let path = dir.join("markers.tsv");
    fs::write(&path, REGISTRY).unwrap();
    path
}

/// Headers map to canonical keys through a registry loaded from disk
#[test]
fn test_normalize_headers_from_file() {
    let dir = tempdir().unwrap();
    let registry = MarkerRegistry::load(write_registry(dir.path())).unwrap();
    assert_eq!(registry.len(), 7);
    assert_eq!(registry.source(), Some(dir.path().join("markers.tsv").as_path()));

    let normalizer = HeaderNormalizer::new(&registry);
    assert_eq!(normalizer.to_db_key("CD45_1_Cell Masks").unwrap(), "56_cl");
    assert_eq!(normalizer.to_db_key("CD45_1_Nuclei Masks").unwrap(), "56_nu");
    assert_eq!(normalizer.to_db_key("DAPI_1_Nuclei Masks").unwrap(), "105_nu");
    assert!(normalizer.to_db_key("DAPI_100_Nuclei Masks").is_err());
    assert_eq!(normalizer.to_db_key("cellID").unwrap(), "sample_cell_id");
    assert_eq!(normalizer.to_db_key("Area").unwrap(), "area");
    assert!(normalizer.to_db_key("Something_New").is_err());
}

/// One unknown header and one unknown declared marker give one error
#[test]
fn test_single_aggregated_incompatibility() {
    let dir = tempdir().unwrap();
    let registry = MarkerRegistry::load(write_registry(dir.path())).unwrap();
    let checker = CompatibilityChecker::new(&registry);

    let result = checker.check(
        &["CellID", "CD45_1_Cell Masks", "Unknown_Cell Masks"],
        &["CD45", "NotAMarker"],
    );
    let CompatibilityError::Incompatible(unknown) = result.unwrap_err();
    assert_eq!(unknown.unknown_markers, vec!["Unknown"]);
    assert_eq!(unknown.unknown_declared, vec!["NotAMarker"]);
    let message = unknown.to_string();
    assert!(message.contains("1 unknown marker(s): Unknown"));
    assert!(message.contains("1 unknown declared marker(s): NotAMarker"));
}

/// A new alias is appended, not turned into a second marker, and survives reload
#[test]
fn test_update_appends_alias_and_reloads() {
    let dir = tempdir().unwrap();
    let source = write_registry(dir.path());
    let mut registry = MarkerRegistry::load(&source).unwrap();
    assert_eq!(registry.resolve("PTPRC"), None);

    let written = registry
        .update(
            &[NewMarker::new("cd45").alias("PTPRC")],
            &[OtherFeature::new("eccentricity", ["Eccentricity"])],
            None,
            false,
        )
        .unwrap();
    assert_eq!(written, dir.path().join("markers.tsv.new"));
    assert_eq!(fs::read_to_string(&source).unwrap(), REGISTRY);

    let reloaded = MarkerRegistry::load(&written).unwrap();
    assert_eq!(reloaded.len(), registry.len());
    assert_eq!(reloaded.resolve("PTPRC"), Some(Identity::Marker(56)));
    assert_eq!(reloaded.resolve("CD45"), registry.resolve("CD45"));
    assert_eq!(
        reloaded.resolve("Eccentricity"),
        Some(Identity::Other("eccentricity".to_string()))
    );
    assert_eq!(
        reloaded.marker(56).unwrap().aliases,
        vec!["CD45_1", "CD-45", "PTPRC"]
    );

    // In-place reload through an explicit destination
    let dest = dir.path().join("snapshot.tsv");
    registry
        .update(&[NewMarker::new("CD3").alias("CD3_1")], &[], Some(&dest), true)
        .unwrap();
    assert_eq!(registry.source(), Some(dest.as_path()));
    assert_eq!(registry.resolve_marker("CD3_1"), Some(10006));
}

/// Comparator context decides which keys are the same column
#[test]
fn test_key_equality_and_fusion() {
    let dir = tempdir().unwrap();
    let registry = MarkerRegistry::load(write_registry(dir.path())).unwrap();
    let ctx = ComparatorContext::default();
    let cmp = HeaderKeyComparator::new(&registry, ctx);

    let cl = |id| HeaderKey::new(id, MaskType::CellMasks);
    assert!(cmp.equals(&cl(10001), &cl(10004)).unwrap());
    assert!(cmp.equals(&cl(10001), &cl(10005)).unwrap());
    assert!(!cmp.equals(&cl(10001), &cl(10002)).unwrap());

    let lists = vec![
        vec![cl(10001), cl(56), HeaderKey::new(105, MaskType::NucleiMasks)],
        vec![cl(10005), HeaderKey::new(105, MaskType::NucleiMasks)],
    ];
    let union = fuse_db_keys(&registry, &lists, FuseMode::Union, ctx).unwrap();
    let intersection = fuse_db_keys(&registry, &lists, FuseMode::Intersection, ctx).unwrap();
    assert_eq!(union.len(), 4);
    assert_eq!(
        intersection.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["10001_cl", "10005_cl", "105_nu"]
    );
}

/// Cell and marker tables on disk ingest into the memory sink
#[test]
fn test_ingest_from_files() {
    let dir = tempdir().unwrap();
    let registry = MarkerRegistry::load(write_registry(dir.path())).unwrap();

    let cells_path = dir.path().join("cells.csv");
    fs::write(
        &cells_path,
        "CellID,CD45_1_Cell Masks,DAPI_1_Nuclei Masks,Area\n\
         1,12.5,300.25,40\n\
         2,8.75,280,38\n",
    )
    .unwrap();
    let markers_path = dir.path().join("markers.csv");
    fs::write(
        &markers_path,
        "marker_name,channel_number,cycle_number\nDAPI,1,1\nCD45,2,1\n",
    )
    .unwrap();

    let cells = CellTable::from_path(&cells_path).unwrap();
    let declared = DeclaredMarker::from_path(&markers_path).unwrap();
    let ingestor = Ingestor::new(&registry, IngestOptions::default());
    let mut sink = MemorySink::new();

    let summary = ingestor
        .ingest_sample_complex(
            &mut sink,
            SampleRecord::new("LUNG-1").with_tag("v1"),
            &cells,
            &declared,
            false,
        )
        .unwrap();

    assert!(summary.committed);
    assert_eq!(summary.cells_inserted, 2);
    assert_eq!(summary.marker_associations, 2);
    assert_eq!(sink.cells().len(), 2);
    assert_eq!(sink.cells()[1].sample_cell_id, Some(2));
    assert_eq!(
        sink.sample_markers().iter().map(|m| m.marker_id).collect::<Vec<_>>(),
        vec![105, 56]
    );

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["cells_inserted"], 2);
    assert_eq!(json["feature_list"][1], "56_cl");
}

use super::*;
use crate::markers::{ComparatorContext, MarkerRegistry};
use crate::test_support::sample_registry;
use proptest::prelude::*;

#[test]
fn test_match_suffix_variants() {
    let cases = [
        ("CD45_1_Cell Masks", "CD45_1", MaskType::CellMasks),
        ("DAPI_1_Nuclei Masks", "DAPI_1", MaskType::NucleiMasks),
        ("DAPI_1_nuclei_masks", "DAPI_1", MaskType::NucleiMasks),
        ("CD3-cell-masks", "CD3", MaskType::CellMasks),
        ("CD3 CELLMASKS", "CD3", MaskType::CellMasks),
        ("CD3_cellpose masks", "CD3", MaskType::NucleiMasks),
        ("CD3_cp_masks", "CD3", MaskType::NucleiMasks),
        ("CD3_cellpose masks on data 12", "CD3", MaskType::NucleiMasks),
        ("CD3_Cellpose_Masks_on_data_", "CD3", MaskType::NucleiMasks),
        ("CD45__cell_masks", "CD45", MaskType::CellMasks),
        ("CD45_1_Cell Masks  ", "CD45_1", MaskType::CellMasks),
    ];

    for (header, marker, mask_type) in cases {
        let found = match_suffix(header).unwrap_or_else(|| panic!("no match for {header}"));
        assert_eq!(found.marker, marker, "{header}");
        assert_eq!(found.mask_type, mask_type, "{header}");
    }
}

#[test]
fn test_non_marker_headers() {
    for header in ["Area", "cellID", "X_centroid", "Cell Masks", "_cell masks", "CD3_masks", "CD3_cells"] {
        assert!(!is_marker_header(header), "{header}");
    }
}

#[test]
fn test_classify_preserves_order_and_case() {
    let headers = [
        "CellID",
        "CD45_1_Cell Masks",
        "Area",
        "DAPI_1_Nuclei Masks",
        "Something_New",
    ];
    let (markers, others) = classify(&headers);
    assert_eq!(markers, vec!["CD45_1_Cell Masks", "DAPI_1_Nuclei Masks"]);
    assert_eq!(others, vec!["CellID", "Area", "Something_New"]);
}

#[test]
fn test_marker_header_to_db_key() {
    let registry = sample_registry();
    let normalizer = HeaderNormalizer::new(&registry);

    assert_eq!(normalizer.to_db_key("CD45_1_Cell Masks").unwrap(), "56_cl");
    assert_eq!(normalizer.to_db_key("CD45_1_Nuclei Masks").unwrap(), "56_nu");
    assert_eq!(normalizer.to_db_key("DAPI_1_Nuclei Masks").unwrap(), "105_nu");
    assert_eq!(normalizer.to_db_key("aSMA_1_cellpose masks on data 3").unwrap(), "7_nu");

    let err = normalizer.to_db_key("DAPI_100_Nuclei Masks").unwrap_err();
    match err {
        HeaderError::UnrecognizedMarker { marker, .. } => assert_eq!(marker, "DAPI_100"),
        other => panic!("unexpected error: {other}"),
    }

    let err = normalizer.marker_header_to_key("DAPI_100_Nuclei Masks__").unwrap_err();
    assert!(matches!(err, HeaderError::UnrecognizedSuffix(_)));
}

#[test]
fn test_other_feature_to_db_key() {
    let registry = sample_registry();
    let normalizer = HeaderNormalizer::new(&registry);

    assert_eq!(normalizer.to_db_key("cellID").unwrap(), "sample_cell_id");
    assert_eq!(normalizer.to_db_key("Area").unwrap(), "area");
    assert_eq!(normalizer.other_feature_to_column("Y").unwrap(), "y_centroid");

    let err = normalizer.to_db_key("Something_New").unwrap_err();
    assert!(matches!(err, HeaderError::UnrecognizedFeature(_)));

    let err = normalizer.other_feature_to_column("CD45").unwrap_err();
    assert!(matches!(err, HeaderError::UnrecognizedFeature(_)));
}

#[test]
fn test_marker_without_suffix() {
    let registry = sample_registry();
    let normalizer = HeaderNormalizer::new(&registry);
    let err = normalizer.to_db_key("CD45").unwrap_err();
    assert!(matches!(err, HeaderError::UnrecognizedSuffix(_)));
}

#[test]
fn test_bare_name_shared_with_feature() {
    // The marker's bare name is only an implicit alias, so the feature keeps it
    let registry = MarkerRegistry::from_reader(
        "kind\tid\tname\taliases\n\
         marker\t3\tX\t\n\
         other\t\tx_centroid\tX\n"
            .as_bytes(),
    )
    .unwrap();
    let normalizer = HeaderNormalizer::new(&registry);
    assert_eq!(normalizer.to_db_key("X").unwrap(), "x_centroid");
    assert_eq!(normalizer.to_db_key("X_Cell Masks").unwrap(), "3_cl");

    let checker = crate::compat::CompatibilityChecker::new(&registry);
    assert!(checker.check(&["X", "X_Cell Masks"], &["X"]).is_ok());
}

#[test]
fn test_feature_list() {
    let registry = sample_registry();
    let normalizer = HeaderNormalizer::new(&registry);
    let list = normalizer
        .feature_list(&["CellID", "CD45_1_Cell Masks", "Area", "DAPI_1_Nuclei Masks"])
        .unwrap();
    assert_eq!(list, vec!["sample_cell_id", "56_cl", "area", "105_nu"]);
}

#[test]
fn test_header_key_parse() {
    let key: HeaderKey = "56_cl".parse().unwrap();
    assert_eq!(key, HeaderKey::new(56, MaskType::CellMasks));
    assert_eq!(key.to_string(), "56_cl");
    assert_eq!("105_nu".parse::<HeaderKey>().unwrap().mask_type, MaskType::NucleiMasks);

    for bad in ["56_xx", "abc_cl", "56cl", "-1_cl", "56_cl_1", ""] {
        let err = bad.parse::<HeaderKey>().unwrap_err();
        assert!(matches!(err, HeaderError::InvalidKey(_)), "{bad}");
    }
}

#[test]
fn test_header_key_serde() {
    let keys = vec![HeaderKey::new(56, MaskType::CellMasks), HeaderKey::new(105, MaskType::NucleiMasks)];
    let json = serde_json::to_string(&keys).unwrap();
    assert_eq!(json, r#"["56_cl","105_nu"]"#);
    let restored: Vec<HeaderKey> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, keys);
    assert!(serde_json::from_str::<HeaderKey>(r#""56_zz""#).is_err());
}

#[test]
fn test_header_key_comparator() {
    let registry = sample_registry();
    let cmp = HeaderKeyComparator::new(&registry, ComparatorContext::default());
    let key = |id| HeaderKey::new(id, MaskType::CellMasks);

    assert!(cmp.equals(&key(10001), &key(10004)).unwrap());
    assert!(cmp.equals(&key(10001), &key(10005)).unwrap());
    assert!(!cmp.equals(&key(10001), &key(10002)).unwrap());
    assert!(!cmp
        .equals(&key(10001), &HeaderKey::new(10001, MaskType::NucleiMasks))
        .unwrap());

    let err = cmp.identity(&key(999)).unwrap_err();
    assert!(matches!(err, HeaderError::UnknownMarker(999)));
}

#[test]
fn test_header_key_labels() {
    let registry = sample_registry();
    let export = HeaderKeyComparator::new(&registry, ComparatorContext::export());
    assert_eq!(
        export.label(&HeaderKey::new(10004, MaskType::CellMasks)).unwrap(),
        "CD1000_goat__cell_masks"
    );
    assert_eq!(
        export.label(&HeaderKey::new(56, MaskType::NucleiMasks)).unwrap(),
        "CD45__nuclei_masks"
    );
}

#[test]
fn test_sort_keys() {
    let registry = sample_registry();
    let cmp = HeaderKeyComparator::new(&registry, ComparatorContext::default());
    let mut keys: Vec<HeaderKey> = ["105_nu", "56_nu", "56_cl", "7_cl", "10002_cl", "10001_cl"]
        .iter()
        .map(|k| k.parse().unwrap())
        .collect();
    cmp.sort(&mut keys).unwrap();
    let sorted: Vec<_> = keys.iter().map(ToString::to_string).collect();
    assert_eq!(sorted, vec!["7_cl", "10001_cl", "10002_cl", "56_cl", "56_nu", "105_nu"]);
}

#[test]
fn test_label_key_roundtrip() {
    let registry = sample_registry();
    let normalizer = HeaderNormalizer::new(&registry);
    let export = HeaderKeyComparator::new(&registry, ComparatorContext::export());

    for marker in registry.markers() {
        for mask_type in [MaskType::CellMasks, MaskType::NucleiMasks] {
            let key = HeaderKey::new(marker.id, mask_type);
            let label = export.label(&key).unwrap();
            let again = normalizer.to_db_key(&label).unwrap();
            assert_eq!(again, key.to_string(), "{label}");
        }
    }
}

proptest! {
    #[test]
    fn prop_suffixed_headers_are_marker_headers(
        name in "[A-Za-z0-9]{1,8}",
        sep in prop::sample::select(vec!["_", " ", "-", "__", " _"]),
        suffix in prop::sample::select(vec![
            "Cell Masks",
            "nuclei_masks",
            "CELL-MASKS",
            "cellpose masks on data 3",
            "cp_masks",
        ]),
    ) {
        let header = format!("{name}{sep}{suffix}");
        let registry = sample_registry();
        let normalizer = HeaderNormalizer::new(&registry);

        let headers = [header.as_str()];
        let (markers, others) = classify(&headers);
        prop_assert_eq!(markers.len(), 1);
        prop_assert!(others.is_empty());
        let suffix_error = matches!(
            normalizer.to_db_key(&header),
            Err(HeaderError::UnrecognizedSuffix(_))
        );
        prop_assert!(!suffix_error);
    }
}

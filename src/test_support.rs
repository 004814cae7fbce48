//! Shared fixtures for unit tests.

use crate::markers::MarkerRegistry;

/// A small registry covering plain markers, fluor/anti/replicate variants
/// and the usual non-marker features.
pub(crate) const SAMPLE_REGISTRY: &str = "\
kind\tid\tname\tfluor\tanti\tduplicate\taliases
marker\t56\tCD45\t\t\t\tCD45_1,CD-45
marker\t105\tDAPI\t\t\t\tDAPI_1,DAPI1
marker\t7\talpha_SMA\t\t\t\taSMA,alpha-SMA,aSMA_1
marker\t10001\tCD1000\t\t\t\tCD1000-A
marker\t10002\tCD1000\tef570\t\t\tCD1000_ef570_1
marker\t10004\tCD1000\t\tgoat\t\tCD1000_goat_1
marker\t10005\tCD1000\t\t\t1\t
other\t\tsample_cell_id\t\t\t\tcellID,CellId
other\t\tarea\t\t\t\tArea
other\t\tx_centroid\t\t\t\tX_centroid,X
other\t\ty_centroid\t\t\t\tY_centroid,Y
";

pub(crate) fn sample_registry() -> MarkerRegistry {
    MarkerRegistry::from_reader(SAMPLE_REGISTRY.as_bytes()).unwrap()
}

//! # cycif-db - Marker Reconciliation for Cyclic Immunofluorescence Data
//!
//! `cycif_db` turns cell quantification tables from CycIF image analysis
//! pipelines into consistently keyed records. Column headers written by
//! different tools and labs (`CD45_1_Cell Masks`, `DAPI_cellpose masks on
//! data 3`, `cellID`) are mapped onto one curated marker registry before
//! anything is stored.
//!
//! ## Key Features
//!
//! - **Marker Registry**: TSV-backed list of markers and non-marker
//!   features with alias resolution and snapshot-based updates.
//!
//! - **Header Normalization**: Mask-suffix classification and canonical
//!   keys of the form `"{marker_id}_{cl|nu}"`.
//!
//! - **Sensitivity-Aware Comparison**: Markers compared with or without
//!   fluorophore and antibody host; replicate tags never count.
//!
//! - **Compatibility Gate**: Every unknown name in a dataset reported in
//!   one aggregated error before any write.
//!
//! - **Key Fusion**: Union or intersection of marker columns across samples.
//!
//! ## Quick Start
//!
//! ```rust
//! use cycif_db::headers::HeaderNormalizer;
//! use cycif_db::markers::MarkerRegistry;
//!
//! let registry = MarkerRegistry::from_reader(
//!     "kind\tid\tname\tfluor\tanti\tduplicate\taliases\n\
//!      marker\t56\tCD45\t\t\t\tCD45_1\n\
//!      other\t\tsample_cell_id\t\t\t\tcellID\n"
//!         .as_bytes(),
//! )?;
//!
//! let normalizer = HeaderNormalizer::new(&registry);
//! assert_eq!(normalizer.to_db_key("CD45_1_Cell Masks")?, "56_cl");
//! assert_eq!(normalizer.to_db_key("cellID")?, "sample_cell_id");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`markers`]: Registry loading, alias resolution, updates and the marker comparator
//! - [`headers`]: Suffix classification, header normalization and canonical keys
//! - [`compat`]: Pre-ingestion compatibility checking and reports
//! - [`fusion`]: Cross-sample key fusion
//! - [`ingest`]: Feature schema, input tables, sinks and the ingestion workflow
//!
//! ## Canonical Formats
//!
//! | Form | Example | Used for |
//! |------|---------|----------|
//! | Key | `56_cl` | Stored marker columns |
//! | Label | `CD1000_ef570_goat__nuclei_masks` | Exported headers |
//! | Feature | `sample_cell_id` | Stored non-marker columns |

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod compat;
pub mod fusion;
pub mod headers;
pub mod ingest;
pub mod markers;

#[cfg(test)]
mod test_support;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::compat::{
        register_unknown, CompatibilityChecker, CompatibilityError, CompatibilityReport,
        IncompatibleSchema,
    };
    pub use crate::fusion::{fuse_db_keys, FuseMode, FusionError};
    pub use crate::headers::{
        classify, HeaderError, HeaderKey, HeaderKeyComparator, HeaderNormalizer, MaskType,
    };
    pub use crate::ingest::{
        CellTable, DeclaredMarker, FeatureSchema, IngestError, IngestOptions, IngestSink,
        Ingestor, MemorySink, SampleRecord,
    };
    pub use crate::markers::{
        ComparatorContext, Identity, Marker, MarkerId, MarkerRegistry, NewMarker, OtherFeature,
        RegistryError,
    };
}

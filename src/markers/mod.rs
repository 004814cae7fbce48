//! # Marker Registry
//!
//! The single source of truth mapping any human-written marker or feature
//! spelling to a canonical identity.
//!
//! ## Registry file
//!
//! A registry is a tab-separated file with one row per entry:
//!
//! ```text
//! kind    id   name     fluor   anti   duplicate  aliases
//! marker  56   CD45                               CD45_1,CD-45
//! marker  105  DAPI                               DAPI_1,DAPI1
//! other        area                               Area,cell area
//! other        sample_cell_id                     cellID,CellId
//! ```
//!
//! Empty cells are absent values, `aliases` is comma-separated and lines
//! starting with `#` are ignored. `duplicate` may also be spelled
//! `replicate`. Marker rows without an `id` are numbered after the highest
//! explicit id.
//!
//! ## Identity
//!
//! Markers are unique on (name, fluor, anti, duplicate), compared without
//! regard to case. Aliases are matched after [`normalize_alias`]. Besides its
//! explicit aliases, each marker answers to its full label
//! (`name_fluor_anti_duplicate`) and, when no other entry claims it, its bare
//! name.
//!
//! Sensitivity-aware equality between markers lives in [`ComparatorContext`].

mod comparator;
mod error;
mod record;
mod registry;


pub use comparator::{
    ComparatorContext, ComparatorError, DuplicatePolicy, MarkerComparator, MarkerIdentity,
    MarkerLookup,
};
pub use error::RegistryError;
pub use record::{normalize_alias, Identity, Marker, MarkerId, NewMarker, OtherFeature, UniqueKey};
pub use registry::MarkerRegistry;

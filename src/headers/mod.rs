//! # Header Classification and Normalization
//!
//! Quantification tools emit one column per (marker, mask) pair with
//! free-form names such as `CD45_1_Cell Masks` or
//! `DAPI_cellpose masks on data 12`. This module
//!
//! 1. classifies headers by their mask-type suffix ([`classify`]),
//! 2. strips the suffix and resolves the marker part through the registry
//!    ([`HeaderNormalizer`]),
//! 3. produces canonical keys ([`HeaderKey`], `"{marker_id}_{cl|nu}"`) and
//!    export labels (`"{label}__{cell_masks|nuclei_masks}"`).
//!
//! | Suffix (case-insensitive)              | Mask type      | Tag  |
//! |----------------------------------------|----------------|------|
//! | `_nuclei masks`                        | `nuclei_masks` | `nu` |
//! | `_cell masks`                          | `cell_masks`   | `cl` |
//! | `_cellpose masks [on data N]`, `_cp …` | `nuclei_masks` | `nu` |
//!
//! Separators between words may be whitespace, `_` or `-`.

mod error;
mod key;
mod normalizer;
mod suffix;

#[cfg(test)]
mod tests;

pub use error::HeaderError;
pub use key::{HeaderKey, HeaderKeyComparator, KeyIdentity};
pub use normalizer::{HeaderNormalizer, NormalizedHeader};
pub use suffix::{classify, is_marker_header, match_suffix, MaskType, SuffixMatch};

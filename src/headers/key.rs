use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::{HeaderError, MaskType};
use crate::markers::{ComparatorContext, Marker, MarkerIdentity, MarkerId, MarkerLookup};

/// Normalized identity of one marker-derived column: `"{marker_id}_{cl|nu}"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HeaderKey {
    /// Registry id of the measured marker
    pub marker_id: MarkerId,
    /// Mask the measurement was taken over
    pub mask_type: MaskType,
}

impl HeaderKey {
    /// Create a key
    pub fn new(marker_id: MarkerId, mask_type: MaskType) -> Self {
        Self {
            marker_id,
            mask_type,
        }
    }
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.marker_id, self.mask_type.tag())
    }
}

impl FromStr for HeaderKey {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HeaderError::InvalidKey(s.to_string());
        let (id, tag) = s.split_once('_').ok_or_else(invalid)?;
        let marker_id = id.parse().map_err(|_| invalid())?;
        let mask_type = MaskType::from_tag(tag).ok_or_else(invalid)?;
        Ok(Self::new(marker_id, mask_type))
    }
}

impl TryFrom<String> for HeaderKey {
    type Error = HeaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HeaderKey> for String {
    fn from(key: HeaderKey) -> Self {
        key.to_string()
    }
}

/// Comparator-identity of a key: marker identity plus mask type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentity {
    marker: MarkerIdentity,
    mask_type: MaskType,
}

/// Sensitivity-aware equality, ordering and labels for [`HeaderKey`]s.
///
/// Keys are plain values; the marker behind each one is looked up on demand.
pub struct HeaderKeyComparator<'a, L: MarkerLookup + ?Sized> {
    lookup: &'a L,
    ctx: ComparatorContext,
}

impl<'a, L: MarkerLookup + ?Sized> HeaderKeyComparator<'a, L> {
    /// Bind a lookup and a context
    pub fn new(lookup: &'a L, ctx: ComparatorContext) -> Self {
        Self { lookup, ctx }
    }

    /// The bound context
    pub fn context(&self) -> ComparatorContext {
        self.ctx
    }

    fn marker(&self, key: &HeaderKey) -> Result<&'a Marker, HeaderError> {
        self.lookup
            .marker(key.marker_id)
            .ok_or(HeaderError::UnknownMarker(key.marker_id))
    }

    /// Identity used for equality and hashing
    pub fn identity(&self, key: &HeaderKey) -> Result<KeyIdentity, HeaderError> {
        Ok(KeyIdentity {
            marker: self.ctx.identity(self.marker(key)?),
            mask_type: key.mask_type,
        })
    }

    /// Whether two keys denote the same measurement under the context
    pub fn equals(&self, a: &HeaderKey, b: &HeaderKey) -> Result<bool, HeaderError> {
        Ok(self.identity(a)? == self.identity(b)?)
    }

    /// Marker label then mask type, with the raw key as the final tie-break
    pub fn compare(&self, a: &HeaderKey, b: &HeaderKey) -> Result<Ordering, HeaderError> {
        let ordering = self
            .ctx
            .cmp_markers(self.marker(a)?, self.marker(b)?)
            .then_with(|| a.mask_type.cmp(&b.mask_type))
            .then_with(|| a.marker_id.cmp(&b.marker_id));
        Ok(ordering)
    }

    /// Human-facing header: `"{label}__{cell_masks|nuclei_masks}"`
    pub fn label(&self, key: &HeaderKey) -> Result<String, HeaderError> {
        Ok(format!(
            "{}__{}",
            self.ctx.label(self.marker(key)?),
            key.mask_type
        ))
    }

    /// Sort keys in place by [`HeaderKeyComparator::compare`]
    pub fn sort(&self, keys: &mut [HeaderKey]) -> Result<(), HeaderError> {
        // Resolve every key up front so the sort closure cannot fail.
        for key in keys.iter() {
            self.marker(key)?;
        }
        keys.sort_by(|a, b| self.compare(a, b).unwrap_or(Ordering::Equal));
        Ok(())
    }
}

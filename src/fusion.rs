//! Fusing per-sample marker key lists into one ordered column list.
//!
//! Samples rarely carry the same marker columns. [`fuse_db_keys`] merges
//! their key lists for cross-sample queries, either keeping everything
//! (`union`) or only markers present in every sample (`intersection`).
//! Presence is judged by comparator identity, so `10001_cl` and `10004_cl`
//! count as the same column when antibody hosts are ignored.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::headers::{HeaderError, HeaderKey, HeaderKeyComparator, KeyIdentity};
use crate::markers::{ComparatorContext, MarkerId, MarkerLookup};

/// Errors raised while fusing key lists
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Bad mode or empty input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A key names a marker the lookup does not know
    #[error("Unknown marker id {0}")]
    UnknownMarker(MarkerId),
}

impl From<HeaderError> for FusionError {
    fn from(error: HeaderError) -> Self {
        match error {
            HeaderError::UnknownMarker(id) => FusionError::UnknownMarker(id),
            other => FusionError::InvalidArgument(other.to_string()),
        }
    }
}

/// How key lists are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FuseMode {
    /// Keep keys whose marker is present in every list
    #[default]
    Intersection,
    /// Keep every key from every list
    Union,
}

impl FuseMode {
    /// String form accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FuseMode::Intersection => "intersection",
            FuseMode::Union => "union",
        }
    }
}

impl FromStr for FuseMode {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intersection" => Ok(FuseMode::Intersection),
            "union" => Ok(FuseMode::Union),
            other => Err(FusionError::InvalidArgument(format!(
                "mode must be one of `intersection`, `union`, but got `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for FuseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fuse per-sample key lists into one list ordered by marker label.
///
/// The union is deduplicated on raw keys. The intersection is that same
/// sorted union, filtered to keys whose comparator identity occurs in every
/// list; comparator-equal keys therefore all survive together.
pub fn fuse_db_keys<L: MarkerLookup + ?Sized>(
    lookup: &L,
    key_lists: &[Vec<HeaderKey>],
    mode: FuseMode,
    ctx: ComparatorContext,
) -> Result<Vec<HeaderKey>, FusionError> {
    if key_lists.is_empty() {
        return Err(FusionError::InvalidArgument(
            "at least one key list is required".to_string(),
        ));
    }

    let cmp = HeaderKeyComparator::new(lookup, ctx);

    let mut seen = HashSet::new();
    let mut fused: Vec<HeaderKey> = key_lists
        .iter()
        .flatten()
        .filter(|key| seen.insert(**key))
        .copied()
        .collect();
    cmp.sort(&mut fused)?;

    if mode == FuseMode::Union {
        return Ok(fused);
    }

    let identity_sets = key_lists
        .iter()
        .map(|list| {
            list.iter()
                .map(|key| cmp.identity(key))
                .collect::<Result<HashSet<KeyIdentity>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut kept = Vec::with_capacity(fused.len());
    for key in fused {
        let identity = cmp.identity(&key)?;
        if identity_sets.iter().all(|set| set.contains(&identity)) {
            kept.push(key);
        }
    }
    Ok(kept)
}

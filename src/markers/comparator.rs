use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::{Marker, MarkerId, MarkerRegistry};

/// Errors raised when building a comparator context
#[derive(Debug, thiserror::Error)]
pub enum ComparatorError {
    /// Unsupported argument value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// How replicate tags are treated when markers are labelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DuplicatePolicy {
    /// Keep the replicate tag in labels
    #[default]
    Keep,
}

impl DuplicatePolicy {
    /// String form used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Keep => "keep",
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ComparatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(DuplicatePolicy::Keep),
            other => Err(ComparatorError::InvalidArgument(format!(
                "unsupported keep_duplicates policy `{}` (expected `keep`)",
                other
            ))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensitivity policy threaded through every marker comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparatorContext {
    /// Compare fluorophores
    pub fluor_sensitive: bool,
    /// Compare antibody hosts
    pub anti_sensitive: bool,
    /// Replicate handling in labels
    pub keep_duplicates: DuplicatePolicy,
}

impl Default for ComparatorContext {
    fn default() -> Self {
        Self {
            fluor_sensitive: true,
            anti_sensitive: false,
            keep_duplicates: DuplicatePolicy::Keep,
        }
    }
}

impl ComparatorContext {
    /// Build a context, rejecting unknown duplicate policies
    pub fn new(
        fluor_sensitive: bool,
        anti_sensitive: bool,
        keep_duplicates: &str,
    ) -> Result<Self, ComparatorError> {
        Ok(Self {
            fluor_sensitive,
            anti_sensitive,
            keep_duplicates: keep_duplicates.parse()?,
        })
    }

    /// Context used for human-facing export headers: every attribute counts
    pub fn export() -> Self {
        Self {
            fluor_sensitive: true,
            anti_sensitive: true,
            keep_duplicates: DuplicatePolicy::Keep,
        }
    }

    /// Whether two markers are the same under this context.
    ///
    /// The replicate tag never takes part.
    pub fn equals(&self, a: &Marker, b: &Marker) -> bool {
        self.identity(a) == self.identity(b)
    }

    /// Display label: name, then fluor, anti and replicate as the context allows
    pub fn label(&self, marker: &Marker) -> String {
        let mut label = marker.name.clone();
        let parts = [
            (self.fluor_sensitive, &marker.fluor),
            (self.anti_sensitive, &marker.anti),
            (self.keep_duplicates == DuplicatePolicy::Keep, &marker.duplicate),
        ];
        for (included, value) in parts {
            if let (true, Some(value)) = (included, value) {
                label.push('_');
                label.push_str(value);
            }
        }
        label
    }

    /// The fields equality and hashing are built from
    pub fn identity(&self, marker: &Marker) -> MarkerIdentity {
        let fold = |v: &Option<String>| v.as_deref().unwrap_or_default().to_lowercase();
        MarkerIdentity {
            name: marker.name.to_lowercase(),
            fluor: self.fluor_sensitive.then(|| fold(&marker.fluor)),
            anti: self.anti_sensitive.then(|| fold(&marker.anti)),
        }
    }

    /// Order markers by label, case-insensitively first
    pub fn cmp_markers(&self, a: &Marker, b: &Marker) -> Ordering {
        let (a, b) = (self.label(a), self.label(b));
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(&b))
    }

    /// View a marker through this context
    pub fn compare<'a>(&self, marker: &'a Marker) -> MarkerComparator<'a> {
        MarkerComparator {
            marker,
            ctx: *self,
        }
    }
}

/// Comparator-identity of a marker: equal identities mean equal markers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerIdentity {
    name: String,
    fluor: Option<String>,
    anti: Option<String>,
}

/// A marker bound to a comparator context, usable as a set or map key
#[derive(Debug, Clone, Copy)]
pub struct MarkerComparator<'a> {
    marker: &'a Marker,
    ctx: ComparatorContext,
}

impl<'a> MarkerComparator<'a> {
    /// The wrapped marker
    pub fn marker(&self) -> &'a Marker {
        self.marker
    }

    /// Label under the bound context
    pub fn label(&self) -> String {
        self.ctx.label(self.marker)
    }
}

impl PartialEq for MarkerComparator<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ctx.equals(self.marker, other.marker)
    }
}

impl Eq for MarkerComparator<'_> {}

impl Hash for MarkerComparator<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ctx.identity(self.marker).hash(state);
    }
}

impl fmt::Display for MarkerComparator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Access to markers by id
pub trait MarkerLookup {
    /// The marker with the given id, if known
    fn marker(&self, id: MarkerId) -> Option<&Marker>;
}

impl MarkerLookup for MarkerRegistry {
    fn marker(&self, id: MarkerId) -> Option<&Marker> {
        MarkerRegistry::marker(self, id)
    }
}

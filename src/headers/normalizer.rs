use log::debug;
use std::fmt;

use super::{match_suffix, HeaderError, HeaderKey};
use crate::markers::MarkerRegistry;

/// Canonical form of one header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalizedHeader {
    /// A marker measurement column
    Marker(HeaderKey),
    /// A non-marker feature column, by canonical lowercase name
    Feature(String),
}

impl fmt::Display for NormalizedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedHeader::Marker(key) => write!(f, "{}", key),
            NormalizedHeader::Feature(name) => f.write_str(name),
        }
    }
}

/// Maps raw spreadsheet headers to canonical database keys.
///
/// Normalization is a pure function of the header and the registry.
#[derive(Debug, Clone, Copy)]
pub struct HeaderNormalizer<'a> {
    registry: &'a MarkerRegistry,
}

impl<'a> HeaderNormalizer<'a> {
    /// Create a normalizer over a registry
    pub fn new(registry: &'a MarkerRegistry) -> Self {
        Self { registry }
    }

    /// The registry consulted for every header
    pub fn registry(&self) -> &'a MarkerRegistry {
        self.registry
    }

    /// Normalize a header of either kind
    pub fn normalize(&self, header: &str) -> Result<NormalizedHeader, HeaderError> {
        if match_suffix(header).is_some() {
            return self.marker_header_to_key(header).map(NormalizedHeader::Marker);
        }
        if let Some(name) = self.registry.resolve_other(header) {
            return Ok(NormalizedHeader::Feature(name.to_lowercase()));
        }
        match self.registry.resolve_marker(header) {
            // A known marker without a mask suffix cannot be placed in a column
            Some(_) => Err(HeaderError::UnrecognizedSuffix(header.to_string())),
            None => Err(HeaderError::UnrecognizedFeature(header.to_string())),
        }
    }

    /// Canonical database key of a header, e.g. `"56_cl"` or `"area"`
    pub fn to_db_key(&self, header: &str) -> Result<String, HeaderError> {
        self.normalize(header).map(|n| n.to_string())
    }

    /// Map a marker header to its key, failing when no mask suffix matches
    pub fn marker_header_to_key(&self, header: &str) -> Result<HeaderKey, HeaderError> {
        let found =
            match_suffix(header).ok_or_else(|| HeaderError::UnrecognizedSuffix(header.to_string()))?;
        let marker_id = self.registry.resolve_marker(found.marker).ok_or_else(|| {
            HeaderError::UnrecognizedMarker {
                header: header.to_string(),
                marker: found.marker.to_string(),
            }
        })?;
        let key = HeaderKey::new(marker_id, found.mask_type);
        debug!("Mapped header `{}` to `{}`", header, key);
        Ok(key)
    }

    /// Map a non-marker header to its feature column
    pub fn other_feature_to_column(&self, header: &str) -> Result<String, HeaderError> {
        self.registry
            .resolve_other(header)
            .map(str::to_lowercase)
            .ok_or_else(|| HeaderError::UnrecognizedFeature(header.to_string()))
    }

    /// Canonical keys of all headers, in input order
    pub fn feature_list<S: AsRef<str>>(&self, headers: &[S]) -> Result<Vec<String>, HeaderError> {
        headers
            .iter()
            .map(|h| self.to_db_key(h.as_ref()))
            .collect()
    }
}

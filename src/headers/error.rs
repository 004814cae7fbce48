use crate::markers::MarkerId;

/// Errors raised while normalizing a single header or key
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// The header carries a mask suffix but the marker part is unknown
    #[error("Unrecognized marker `{marker}` in header `{header}`")]
    UnrecognizedMarker {
        /// The full header
        header: String,
        /// The header with its mask suffix stripped
        marker: String,
    },

    /// A non-marker header that matches no known feature
    #[error("Unrecognized header: `{0}`")]
    UnrecognizedFeature(String),

    /// A marker header without a recognized mask-type suffix
    #[error("Unrecognized mask suffix for header: `{0}`")]
    UnrecognizedSuffix(String),

    /// A canonical key that is not of the form `{id}_{cl|nu}`
    #[error("Invalid database key: `{0}`")]
    InvalidKey(String),

    /// A key referencing a marker id the registry does not know
    #[error("No marker with id {0} in the registry")]
    UnknownMarker(MarkerId),
}

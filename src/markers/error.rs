use super::MarkerId;

/// Errors that can occur while loading or updating a marker registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two marker rows share the same (name, fluor, anti, duplicate) key
    #[error("Duplicate marker {key}: ids {first} and {second} collide")]
    DuplicateMarker {
        /// Display form of the colliding uniqueness key
        key: String,
        /// Id of the row loaded first
        first: MarkerId,
        /// Id of the colliding row
        second: MarkerId,
    },

    /// Two marker rows carry the same id
    #[error("Marker id {0} is used by more than one row")]
    DuplicateId(MarkerId),

    /// Two other-feature rows share the same canonical name
    #[error("Duplicate feature name: {0}")]
    DuplicateFeature(String),

    /// An explicit alias points at two different entries
    #[error("Alias `{alias}` maps to both `{first}` and `{second}`")]
    AliasConflict {
        /// The normalized alias
        alias: String,
        /// Entry that claimed the alias first
        first: String,
        /// Entry that claimed it second
        second: String,
    },

    /// A registry row could not be interpreted
    #[error("Invalid registry record at line {line}: {reason}")]
    InvalidRecord {
        /// 1-based line in the registry file, 0 for entries added by an update
        line: u64,
        /// What was wrong with the row
        reason: String,
    },

    /// The registry has no backing file and no destination was given
    #[error("Registry has no source file; an explicit destination is required")]
    MissingSource,

    /// I/O error reading or writing the registry
    #[error("Failed to access registry file: {0}")]
    Io(#[from] std::io::Error),

    /// TSV parsing or writing error
    #[error("Registry TSV error: {0}")]
    Csv(#[from] csv::Error),
}

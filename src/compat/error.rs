use std::fmt;

/// Names that failed to resolve during one compatibility check, by bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncompatibleSchema {
    /// Bare marker names taken from suffixed cell headers
    pub unknown_markers: Vec<String>,
    /// Cell headers without a mask suffix that match no feature
    pub unknown_others: Vec<String>,
    /// Entries of the declared marker list that match no marker
    pub unknown_declared: Vec<String>,
}

impl IncompatibleSchema {
    /// True when every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.unknown_markers.is_empty()
            && self.unknown_others.is_empty()
            && self.unknown_declared.is_empty()
    }

    /// Number of unresolved names over all buckets
    pub fn total(&self) -> usize {
        self.unknown_markers.len() + self.unknown_others.len() + self.unknown_declared.len()
    }
}

fn write_bucket(f: &mut fmt::Formatter<'_>, what: &str, names: &[String]) -> fmt::Result {
    write!(f, "{} unknown {}", names.len(), what)?;
    if !names.is_empty() {
        write!(f, ": {}", names.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for IncompatibleSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bucket(f, "marker(s)", &self.unknown_markers)?;
        f.write_str("; ")?;
        write_bucket(f, "other feature(s)", &self.unknown_others)?;
        f.write_str("; ")?;
        write_bucket(f, "declared marker(s)", &self.unknown_declared)
    }
}

/// Errors raised by the pre-ingestion gate
#[derive(Debug, thiserror::Error)]
pub enum CompatibilityError {
    /// One or more names in the dataset could not be resolved
    #[error("Incompatible schema: {0}")]
    Incompatible(IncompatibleSchema),
}

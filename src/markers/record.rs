use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-assigned marker identifier, stable across snapshots
pub type MarkerId = u32;

/// Normalize a marker or feature spelling for alias lookup.
///
/// Whitespace is removed, letters are lowercased and hyphens become
/// underscores, so `alpha-SMA`, `Alpha_SMA` and `alpha _sma` all share one key.
pub fn normalize_alias(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| if c == '-' { '_' } else { c })
        .collect()
}

/// A canonical biological marker entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Registry id, used as the foreign key in canonical column keys
    pub id: MarkerId,
    /// Marker name (e.g., "CD45")
    pub name: String,
    /// Fluorophore tag
    pub fluor: Option<String>,
    /// Antibody host or clone
    pub anti: Option<String>,
    /// Replicate tag disambiguating otherwise identical rows
    pub duplicate: Option<String>,
    /// Alternate spellings as written in the registry
    pub aliases: Vec<String>,
}

impl Marker {
    /// Create a marker with only a name
    pub fn new(id: MarkerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            fluor: None,
            anti: None,
            duplicate: None,
            aliases: Vec::new(),
        }
    }

    /// Set the fluorophore
    pub fn with_fluor(mut self, fluor: &str) -> Self {
        self.fluor = Some(fluor.to_string());
        self
    }

    /// Set the antibody host
    pub fn with_anti(mut self, anti: &str) -> Self {
        self.anti = Some(anti.to_string());
        self
    }

    /// Set the replicate tag
    pub fn with_duplicate(mut self, duplicate: impl ToString) -> Self {
        self.duplicate = Some(duplicate.to_string());
        self
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Case-insensitive uniqueness key of this marker
    pub fn unique_key(&self) -> UniqueKey {
        UniqueKey::new(
            &self.name,
            self.fluor.as_deref(),
            self.anti.as_deref(),
            self.duplicate.as_deref(),
        )
    }

    /// Every present attribute joined by `_`; unique within a registry
    pub fn full_label(&self) -> String {
        let mut label = self.name.clone();
        for part in [&self.fluor, &self.anti, &self.duplicate].into_iter().flatten() {
            label.push('_');
            label.push_str(part);
        }
        label
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_label(), self.id)
    }
}

/// Lowercased (name, fluor, anti, duplicate) tuple; absent values are empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueKey {
    name: String,
    fluor: String,
    anti: String,
    duplicate: String,
}

impl UniqueKey {
    /// Build a key from raw attribute values
    pub fn new(name: &str, fluor: Option<&str>, anti: Option<&str>, duplicate: Option<&str>) -> Self {
        let fold = |v: Option<&str>| v.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        Self {
            name: name.trim().to_lowercase(),
            fluor: fold(fluor),
            anti: fold(anti),
            duplicate: fold(duplicate),
        }
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.name)?;
        if !self.fluor.is_empty() {
            write!(f, " fluor={}", self.fluor)?;
        }
        if !self.anti.is_empty() {
            write!(f, " anti={}", self.anti)?;
        }
        if !self.duplicate.is_empty() {
            write!(f, " duplicate={}", self.duplicate)?;
        }
        Ok(())
    }
}

/// A marker to merge into a registry; matched against existing rows by uniqueness key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMarker {
    /// Marker name
    pub name: String,
    /// Fluorophore tag
    pub fluor: Option<String>,
    /// Antibody host
    pub anti: Option<String>,
    /// Replicate tag
    pub duplicate: Option<String>,
    /// Aliases to append
    pub aliases: Vec<String>,
}

impl NewMarker {
    /// Start an update entry for the named marker
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the fluorophore
    pub fn fluor(mut self, fluor: &str) -> Self {
        self.fluor = Some(fluor.to_string());
        self
    }

    /// Set the antibody host
    pub fn anti(mut self, anti: &str) -> Self {
        self.anti = Some(anti.to_string());
        self
    }

    /// Set the replicate tag
    pub fn duplicate(mut self, duplicate: impl ToString) -> Self {
        self.duplicate = Some(duplicate.to_string());
        self
    }

    /// Add an alias
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub(crate) fn unique_key(&self) -> UniqueKey {
        UniqueKey::new(
            &self.name,
            self.fluor.as_deref(),
            self.anti.as_deref(),
            self.duplicate.as_deref(),
        )
    }
}

impl From<&Marker> for NewMarker {
    fn from(marker: &Marker) -> Self {
        Self {
            name: marker.name.clone(),
            fluor: marker.fluor.clone(),
            anti: marker.anti.clone(),
            duplicate: marker.duplicate.clone(),
            aliases: marker.aliases.clone(),
        }
    }
}

/// A non-marker numeric column (area, centroids, shape descriptors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherFeature {
    /// Canonical database column name
    pub name: String,
    /// Alternate spellings
    pub aliases: Vec<String>,
}

impl OtherFeature {
    /// Create a feature with its aliases
    pub fn new<I, S>(name: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a header or alias resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A registry marker
    Marker(MarkerId),
    /// A canonical other-feature column name
    Other(String),
}

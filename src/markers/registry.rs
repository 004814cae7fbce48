use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use super::{
    normalize_alias, Identity, Marker, MarkerId, NewMarker, OtherFeature, RegistryError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RowKind {
    Marker,
    Other,
}

/// One line of the registry TSV
#[derive(Debug, Serialize, Deserialize)]
struct RegistryRow {
    kind: RowKind,
    id: Option<MarkerId>,
    name: String,
    fluor: Option<String>,
    anti: Option<String>,
    #[serde(alias = "replicate")]
    duplicate: Option<String>,
    aliases: Option<String>,
}

impl RegistryRow {
    fn from_marker(marker: &Marker) -> Self {
        Self {
            kind: RowKind::Marker,
            id: Some(marker.id),
            name: marker.name.clone(),
            fluor: marker.fluor.clone(),
            anti: marker.anti.clone(),
            duplicate: marker.duplicate.clone(),
            aliases: join_aliases(&marker.aliases),
        }
    }

    fn from_feature(feature: &OtherFeature) -> Self {
        Self {
            kind: RowKind::Other,
            id: None,
            name: feature.name.clone(),
            fluor: None,
            anti: None,
            duplicate: None,
            aliases: join_aliases(&feature.aliases),
        }
    }
}

fn join_aliases(aliases: &[String]) -> Option<String> {
    if aliases.is_empty() {
        None
    } else {
        Some(aliases.join(","))
    }
}

fn split_aliases(aliases: Option<&str>) -> Vec<String> {
    aliases
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Append aliases whose normalized form is not already known
fn append_aliases(list: &mut Vec<String>, implicit: &str, additions: &[String]) {
    let mut known: HashSet<String> = list.iter().map(|a| normalize_alias(a)).collect();
    known.insert(normalize_alias(implicit));
    for alias in additions.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        if known.insert(normalize_alias(alias)) {
            list.push(alias.to_string());
        }
    }
}

/// Parse registry rows, assigning ids to marker rows that lack one
fn parse_rows<R: Read>(reader: R) -> Result<(Vec<Marker>, Vec<OtherFeature>), RegistryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut markers: Vec<(bool, u64, Marker)> = Vec::new();
    let mut others = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let row: RegistryRow = record.deserialize(Some(&headers))?;

        if row.name.is_empty() {
            return Err(RegistryError::InvalidRecord {
                line,
                reason: "empty name".to_string(),
            });
        }

        let aliases = split_aliases(row.aliases.as_deref());
        match row.kind {
            RowKind::Marker => markers.push((
                row.id.is_some(),
                line,
                Marker {
                    id: row.id.unwrap_or_default(),
                    name: row.name,
                    fluor: non_empty(row.fluor),
                    anti: non_empty(row.anti),
                    duplicate: non_empty(row.duplicate),
                    aliases,
                },
            )),
            RowKind::Other => {
                if row.id.is_some() {
                    return Err(RegistryError::InvalidRecord {
                        line,
                        reason: format!("other feature `{}` cannot carry a marker id", row.name),
                    });
                }
                others.push(OtherFeature {
                    name: row.name,
                    aliases,
                });
            }
        }
    }

    let mut next_id = first_free_id(
        markers
            .iter()
            .filter(|(explicit, _, _)| *explicit)
            .map(|(_, _, m)| m.id),
    );

    let markers = markers
        .into_iter()
        .map(|(explicit, line, mut marker)| -> Result<Marker, RegistryError> {
            if !explicit {
                marker.id = take_id(&mut next_id).ok_or_else(|| RegistryError::InvalidRecord {
                    line,
                    reason: format!("no marker id left to assign to `{}`", marker.name),
                })?;
            }
            Ok(marker)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((markers, others))
}

/// One past the highest id in use; `None` once the id space is exhausted
fn first_free_id(ids: impl Iterator<Item = MarkerId>) -> Option<MarkerId> {
    match ids.max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

/// Hand out the next free id
fn take_id(next_id: &mut Option<MarkerId>) -> Option<MarkerId> {
    let id = (*next_id)?;
    *next_id = id.checked_add(1);
    Some(id)
}

/// The curated list of known markers and non-marker features.
///
/// Lookup tables are built once at construction and never change through
/// `&self`, so a registry can be shared freely between readers. Only
/// [`MarkerRegistry::update`] needs exclusive access.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    source: Option<PathBuf>,
    markers: Vec<Marker>,
    by_id: HashMap<MarkerId, usize>,
    others: Vec<OtherFeature>,
    marker_aliases: HashMap<String, MarkerId>,
    other_aliases: HashMap<String, usize>,
}

impl MarkerRegistry {
    /// Load a registry from a TSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut registry = Self::from_reader(BufReader::new(file))?;
        registry.source = Some(path.to_path_buf());
        info!("Loaded marker registry from {}", path.display());
        Ok(registry)
    }

    /// Parse a registry from any reader. The result has no backing file.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegistryError> {
        let (markers, others) = parse_rows(reader)?;
        Self::from_parts(markers, others)
    }

    /// Build a registry from already constructed entries
    pub fn from_parts(
        markers: Vec<Marker>,
        others: Vec<OtherFeature>,
    ) -> Result<Self, RegistryError> {
        let mut by_id = HashMap::with_capacity(markers.len());
        let mut unique = HashMap::with_capacity(markers.len());
        for (idx, marker) in markers.iter().enumerate() {
            if by_id.insert(marker.id, idx).is_some() {
                return Err(RegistryError::DuplicateId(marker.id));
            }
            let key = marker.unique_key();
            if let Some(first) = unique.insert(key.clone(), marker.id) {
                return Err(RegistryError::DuplicateMarker {
                    key: key.to_string(),
                    first,
                    second: marker.id,
                });
            }
        }

        let mut marker_aliases: HashMap<String, MarkerId> = HashMap::new();
        for marker in &markers {
            for alias in &marker.aliases {
                let key = normalize_alias(alias);
                match marker_aliases.get(&key) {
                    Some(&owner) if owner != marker.id => {
                        return Err(RegistryError::AliasConflict {
                            alias: key,
                            first: markers[by_id[&owner]].full_label(),
                            second: marker.full_label(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        marker_aliases.insert(key, marker.id);
                    }
                }
            }
        }

        // Implicit aliases fill gaps only: full labels first, then bare names.
        for marker in &markers {
            let key = normalize_alias(&marker.full_label());
            let owner = *marker_aliases.entry(key.clone()).or_insert(marker.id);
            if owner != marker.id {
                debug!("Label `{}` of marker {} is claimed by marker {}", key, marker.id, owner);
            }
        }
        for marker in &markers {
            marker_aliases
                .entry(normalize_alias(&marker.name))
                .or_insert(marker.id);
        }

        let mut other_aliases: HashMap<String, usize> = HashMap::new();
        let mut canonical = HashSet::with_capacity(others.len());
        for (idx, feature) in others.iter().enumerate() {
            if !canonical.insert(normalize_alias(&feature.name)) {
                return Err(RegistryError::DuplicateFeature(feature.name.clone()));
            }
            for alias in std::iter::once(&feature.name).chain(&feature.aliases) {
                let key = normalize_alias(alias);
                match other_aliases.get(&key) {
                    Some(&owner) if owner != idx => {
                        return Err(RegistryError::AliasConflict {
                            alias: key,
                            first: others[owner].name.clone(),
                            second: feature.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        other_aliases.insert(key, idx);
                    }
                }
            }
        }

        // Explicit marker aliases may not shadow any spelling of a feature
        for marker in &markers {
            for alias in &marker.aliases {
                let key = normalize_alias(alias);
                if let Some(&idx) = other_aliases.get(&key) {
                    return Err(RegistryError::AliasConflict {
                        alias: key,
                        first: marker.full_label(),
                        second: others[idx].name.clone(),
                    });
                }
            }
        }

        info!(
            "Registry holds {} markers ({} aliases) and {} other features ({} aliases)",
            markers.len(),
            marker_aliases.len(),
            others.len(),
            other_aliases.len()
        );

        Ok(Self {
            source: None,
            markers,
            by_id,
            others,
            marker_aliases,
            other_aliases,
        })
    }

    /// Path the registry was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// All markers in registry order
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// All other features in registry order
    pub fn other_features(&self) -> &[OtherFeature] {
        &self.others
    }

    /// Marker by id
    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.by_id.get(&id).map(|&idx| &self.markers[idx])
    }

    /// Number of markers
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the registry holds no markers
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Resolve any spelling to a marker or feature, markers first.
    ///
    /// Returns `None` for unknown names; callers decide whether that is fatal.
    pub fn resolve(&self, name: &str) -> Option<Identity> {
        let key = normalize_alias(name);
        if let Some(&id) = self.marker_aliases.get(&key) {
            return Some(Identity::Marker(id));
        }
        if let Some(&idx) = self.other_aliases.get(&key) {
            return Some(Identity::Other(self.others[idx].name.clone()));
        }
        debug!("The name `{}` was not recognized", name);
        None
    }

    /// Resolve a spelling against the marker table only
    pub fn resolve_marker(&self, name: &str) -> Option<MarkerId> {
        self.marker_aliases.get(&normalize_alias(name)).copied()
    }

    /// Resolve a spelling against the other-feature table only
    pub fn resolve_other(&self, name: &str) -> Option<&str> {
        self.other_aliases
            .get(&normalize_alias(name))
            .map(|&idx| self.others[idx].name.as_str())
    }

    /// Markers whose name, fluor or anti contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&Marker> {
        let query = query.to_lowercase();
        self.markers
            .iter()
            .filter(|m| {
                [Some(&m.name), m.fluor.as_ref(), m.anti.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|v| v.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Merge new aliases and entries, then write a full snapshot.
    ///
    /// New markers are matched against existing rows by uniqueness key and
    /// new features by canonical name; matches gain the aliases they do not
    /// already carry, everything else becomes a new row. The merged registry
    /// is re-read from the backing file first when there is one.
    ///
    /// The snapshot goes to `destination`, or `<source>.new` when omitted.
    /// With `reload` the in-memory registry is replaced by the snapshot.
    /// Returns the path written.
    pub fn update(
        &mut self,
        new_markers: &[NewMarker],
        new_others: &[OtherFeature],
        destination: Option<&Path>,
        reload: bool,
    ) -> Result<PathBuf, RegistryError> {
        let destination = match destination {
            Some(path) => path.to_path_buf(),
            None => {
                let source = self.source.as_ref().ok_or(RegistryError::MissingSource)?;
                let mut path = OsString::from(source.as_os_str());
                path.push(".new");
                PathBuf::from(path)
            }
        };

        let (mut markers, mut others) = match &self.source {
            Some(path) => parse_rows(BufReader::new(File::open(path)?))?,
            None => (self.markers.clone(), self.others.clone()),
        };

        let mut next_id = first_free_id(markers.iter().map(|m| m.id));
        let mut added_markers = 0;
        for new in new_markers {
            let key = new.unique_key();
            if let Some(existing) = markers.iter_mut().find(|m| m.unique_key() == key) {
                let label = existing.full_label();
                append_aliases(&mut existing.aliases, &label, &new.aliases);
                continue;
            }
            let mut marker = Marker {
                id: take_id(&mut next_id).ok_or_else(|| RegistryError::InvalidRecord {
                    line: 0,
                    reason: format!("no marker id left to assign to `{}`", new.name),
                })?,
                name: new.name.trim().to_string(),
                fluor: non_empty(new.fluor.clone()),
                anti: non_empty(new.anti.clone()),
                duplicate: non_empty(new.duplicate.clone()),
                aliases: Vec::new(),
            };
            let label = marker.full_label();
            append_aliases(&mut marker.aliases, &label, &new.aliases);
            markers.push(marker);
            added_markers += 1;
        }

        let mut added_others = 0;
        for new in new_others {
            let key = normalize_alias(&new.name);
            if let Some(existing) = others.iter_mut().find(|f| normalize_alias(&f.name) == key) {
                let name = existing.name.clone();
                append_aliases(&mut existing.aliases, &name, &new.aliases);
                continue;
            }
            let mut feature = OtherFeature::new(new.name.trim(), Vec::<String>::new());
            append_aliases(&mut feature.aliases, &new.name, &new.aliases);
            others.push(feature);
            added_others += 1;
        }

        let merged = Self::from_parts(markers, others)?;
        merged.write_snapshot(&destination)?;
        info!(
            "Marker/feature registry updated ({} new markers, {} new features) at {}",
            added_markers,
            added_others,
            destination.display()
        );

        if reload {
            *self = Self::load(&destination)?;
        }

        Ok(destination)
    }

    /// Write the full registry to `path` through a temporary file
    pub fn write_snapshot(&self, path: &Path) -> Result<(), RegistryError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.to_writer(tmp.as_file_mut())?;
        tmp.persist(path).map_err(|e| RegistryError::Io(e.error))?;
        Ok(())
    }

    /// Serialize the registry as TSV
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), RegistryError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for marker in &self.markers {
            wtr.serialize(RegistryRow::from_marker(marker))?;
        }
        for feature in &self.others {
            wtr.serialize(RegistryRow::from_feature(feature))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

//! # Compatibility Checking
//!
//! The gate every dataset passes before anything is written. A dataset is
//! its cell-table headers plus the list of markers its submitter declared.
//!
//! ## Checks
//!
//! 1. **Marker headers**: the marker part of every suffixed header resolves
//! 2. **Other feature headers**: every remaining header names a known feature
//! 3. **Declared markers**: every declared name resolves to a marker
//! 4. **Declared marker coverage**: markers found in the headers were also
//!    declared (warning only)
//!
//! All names are examined before a verdict is given, so a failing dataset
//! yields one [`CompatibilityError::Incompatible`] listing every offender.
//! Those offenders can be fed back into the registry with
//! [`register_unknown`].
//!
//! ```rust
//! use cycif_db::compat::CompatibilityChecker;
//! use cycif_db::markers::MarkerRegistry;
//!
//! let registry = MarkerRegistry::from_reader(
//!     "kind\tid\tname\tfluor\tanti\tduplicate\taliases\n\
//!      marker\t56\tCD45\t\t\t\tCD45_1\n\
//!      other\t\tarea\t\t\t\tArea\n"
//!         .as_bytes(),
//! )?;
//! let checker = CompatibilityChecker::new(&registry);
//! let report = checker.check(&["CD45_1_Cell Masks", "Area"], &["CD45"])?;
//! assert!(!report.has_failures());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::headers::{classify, match_suffix};
use crate::markers::{
    normalize_alias, MarkerId, MarkerRegistry, NewMarker, OtherFeature, RegistryError,
};

mod error;
mod report;


pub use error::{CompatibilityError, IncompatibleSchema};
pub use report::{CheckStatus, CompatibilityCheck, CompatibilityReport};

/// Verifies a dataset's headers and declared markers against a registry
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityChecker<'a> {
    registry: &'a MarkerRegistry,
}

impl<'a> CompatibilityChecker<'a> {
    /// Create a checker over a registry
    pub fn new(registry: &'a MarkerRegistry) -> Self {
        Self { registry }
    }

    /// Run every check and collect the findings without failing
    pub fn inspect<H, D>(&self, cell_headers: &[H], declared_markers: &[D]) -> CompatibilityReport
    where
        H: AsRef<str>,
        D: AsRef<str>,
    {
        let mut report = CompatibilityReport::default();
        let (marker_headers, other_headers) = classify(cell_headers);

        // Header markers that resolved, in first-seen order
        let mut found: Vec<(MarkerId, &str)> = Vec::new();
        let mut seen_ids = HashSet::new();
        for header in marker_headers {
            let Some(part) = match_suffix(header) else {
                continue;
            };
            match self.registry.resolve_marker(part.marker) {
                Some(id) => {
                    if seen_ids.insert(id) {
                        found.push((id, part.marker));
                    }
                }
                None => push_unique(&mut report.unknown.unknown_markers, part.marker),
            }
        }

        for header in other_headers {
            if self.registry.resolve_other(header).is_none() {
                push_unique(&mut report.unknown.unknown_others, header);
            }
        }

        let mut declared_ids = HashSet::new();
        for name in declared_markers {
            let name = name.as_ref();
            match self.registry.resolve_marker(name) {
                Some(id) => {
                    declared_ids.insert(id);
                }
                None => push_unique(&mut report.unknown.unknown_declared, name),
            }
        }

        report.add_check(CompatibilityCheck::from_unknown(
            "Marker headers",
            &report.unknown.unknown_markers,
        ));
        report.add_check(CompatibilityCheck::from_unknown(
            "Other feature headers",
            &report.unknown.unknown_others,
        ));
        report.add_check(CompatibilityCheck::from_unknown(
            "Declared markers",
            &report.unknown.unknown_declared,
        ));

        for (id, name) in found {
            if !declared_ids.contains(&id) {
                warn!(
                    "Marker `{}` (id {}) is present in the cell table but was not declared",
                    name, id
                );
                report.undeclared.push(name.to_string());
            }
        }
        let coverage = if report.undeclared.is_empty() {
            CompatibilityCheck::ok("Declared marker coverage")
        } else {
            CompatibilityCheck::warning(
                "Declared marker coverage",
                format!(
                    "{} marker(s) not declared: {}",
                    report.undeclared.len(),
                    report.undeclared.join(", ")
                ),
            )
        };
        report.add_check(coverage);

        report
    }

    /// Gate a dataset: `Ok` with the report when every name resolves,
    /// otherwise one aggregated error
    pub fn check<H, D>(
        &self,
        cell_headers: &[H],
        declared_markers: &[D],
    ) -> Result<CompatibilityReport, CompatibilityError>
    where
        H: AsRef<str>,
        D: AsRef<str>,
    {
        let report = self.inspect(cell_headers, declared_markers).into_result()?;
        info!(
            "Compatibility check passed for {} headers and {} declared markers",
            cell_headers.len(),
            declared_markers.len()
        );
        Ok(report)
    }
}

fn push_unique(bucket: &mut Vec<String>, name: &str) {
    if !bucket.iter().any(|n| n == name) {
        bucket.push(name.to_string());
    }
}

/// Add the unresolved names of a failed check to the registry.
///
/// Unknown header markers and declared markers become new markers named as
/// written. Unknown other headers become features named by their normalized
/// spelling, keeping the header itself as an alias. An other header that
/// resolves to a marker is only missing its mask suffix and is skipped.
///
/// The snapshot is written like [`MarkerRegistry::update`] writes it, to
/// `destination` or `<source>.new`. Returns the path written.
pub fn register_unknown(
    registry: &mut MarkerRegistry,
    unknown: &IncompatibleSchema,
    destination: Option<&Path>,
    reload: bool,
) -> Result<PathBuf, RegistryError> {
    let mut seen = HashSet::new();
    let new_markers: Vec<NewMarker> = unknown
        .unknown_markers
        .iter()
        .chain(&unknown.unknown_declared)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(normalize_alias(name)))
        .map(NewMarker::new)
        .collect();

    let mut seen = HashSet::new();
    let mut new_others = Vec::new();
    for header in unknown.unknown_others.iter().map(|h| h.trim()) {
        let name = normalize_alias(header);
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        if let Some(id) = registry.resolve_marker(header) {
            warn!(
                "Header `{}` names marker {} but has no mask suffix; not added as a feature",
                header, id
            );
            continue;
        }
        new_others.push(OtherFeature::new(&name, [header]));
    }

    info!(
        "Registering {} unknown markers and {} unknown features",
        new_markers.len(),
        new_others.len()
    );
    registry.update(&new_markers, &new_others, destination, reload)
}

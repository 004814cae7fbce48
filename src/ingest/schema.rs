use serde::Serialize;
use std::fmt;

use super::IngestError;
use crate::headers::{HeaderError, HeaderKey, HeaderKeyComparator};
use crate::markers::{ComparatorContext, MarkerLookup, MarkerRegistry};

/// Column holding the cell's id within its sample
pub const SAMPLE_CELL_ID: &str = "sample_cell_id";

/// Precision of numeric feature columns
pub const NUMERIC_PRECISION: u8 = 15;

/// Scale of numeric feature columns
pub const NUMERIC_SCALE: u8 = 4;

/// Storage type of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Whole number
    Integer,
    /// Fixed-point decimal
    Numeric {
        /// Total significant digits
        precision: u8,
        /// Digits after the decimal point
        scale: u8,
    },
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureType::Integer => f.write_str("INTEGER"),
            FeatureType::Numeric { precision, scale } => {
                write!(f, "NUMERIC({}, {})", precision, scale)
            }
        }
    }
}

/// A value coerced to its column type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Integer column value
    Integer(i64),
    /// Numeric column value, already rounded to the column scale
    Numeric(f64),
}

/// Columns of the cell table besides the marker feature map.
///
/// Built from the registry's other features: `sample_cell_id` is an
/// integer, everything else is `NUMERIC(15, 4)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<(String, FeatureType)>,
}

impl FeatureSchema {
    /// Derive the schema from a registry
    pub fn from_registry(registry: &MarkerRegistry) -> Self {
        let columns = registry
            .other_features()
            .iter()
            .map(|feature| {
                let name = feature.name.to_lowercase();
                let ty = if name == SAMPLE_CELL_ID {
                    FeatureType::Integer
                } else {
                    FeatureType::Numeric {
                        precision: NUMERIC_PRECISION,
                        scale: NUMERIC_SCALE,
                    }
                };
                (name, ty)
            })
            .collect();
        Self { columns }
    }

    /// Type of a column
    pub fn get(&self, column: &str) -> Option<FeatureType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|&(_, ty)| ty)
    }

    /// Columns in registry order
    pub fn columns(&self) -> impl Iterator<Item = (&str, FeatureType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Column names ordered by [`column_sort_key`]
    pub fn sorted_columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_by_key(|n| column_sort_key(*n));
        names
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert a raw value for storage in `column`
    pub fn coerce(&self, column: &str, value: f64) -> Result<FeatureValue, IngestError> {
        let invalid = || IngestError::InvalidValue {
            column: column.to_string(),
            value,
        };
        match self.get(column) {
            None => Err(IngestError::UnknownColumn(column.to_string())),
            Some(FeatureType::Integer) => {
                if !value.is_finite() || value.abs() > i64::MAX as f64 {
                    return Err(invalid());
                }
                Ok(FeatureValue::Integer(value.trunc() as i64))
            }
            Some(FeatureType::Numeric { precision, scale }) => {
                let rounded = round_to(value, u32::from(scale));
                let limit = 10f64.powi(i32::from(precision) - i32::from(scale));
                if rounded.is_finite() && rounded.abs() >= limit {
                    return Err(invalid());
                }
                Ok(FeatureValue::Numeric(rounded))
            }
        }
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Ordering key for export columns: `*_id` first, then `*_masks`, then the rest
pub fn column_sort_key(column: &str) -> (u8, &str) {
    let rank = if column.ends_with("_id") {
        0
    } else if column.ends_with("_masks") {
        1
    } else {
        2
    };
    (rank, column)
}

/// Header row for exporting one sample's cells: sample name and tag, the
/// sorted feature columns, then marker labels under the export context
pub fn export_columns<L: MarkerLookup + ?Sized>(
    schema: &FeatureSchema,
    keys: &[HeaderKey],
    lookup: &L,
) -> Result<Vec<String>, HeaderError> {
    let cmp = HeaderKeyComparator::new(lookup, ComparatorContext::export());
    let mut keys = keys.to_vec();
    cmp.sort(&mut keys)?;

    let mut columns = vec!["sample_name".to_string(), "sample_tag".to_string()];
    columns.extend(schema.sorted_columns().into_iter().map(str::to_string));
    for key in &keys {
        columns.push(cmp.label(key)?);
    }
    Ok(columns)
}

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::TableError;

/// A cell quantification table: one header row, one numeric row per cell.
///
/// Empty cells are kept as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl CellTable {
    /// Build a table from headers and rows, checking row widths
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Result<Self, TableError> {
        for (row, values) in rows.iter().enumerate() {
            if values.len() != headers.len() {
                return Err(TableError::RowLength {
                    row,
                    expected: headers.len(),
                    found: values.len(),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    /// Read a comma-separated table
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let values = record
                .iter()
                .zip(&headers)
                .map(|(field, column)| parse_cell(field, column, line))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }

        Self::new(headers, rows)
    }

    /// Read a table from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Column headers as written
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_cell(field: &str, column: &str, line: u64) -> Result<Option<f64>, TableError> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse::<f64>()
        .map(Some)
        .map_err(|_| TableError::InvalidNumber {
            line,
            column: column.to_string(),
            value: field.to_string(),
        })
}

/// One row of a sample's declared marker table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredMarker {
    /// Marker name as written by the submitter
    pub marker_name: String,
    /// Imaging channel
    #[serde(default)]
    pub channel_number: Option<i64>,
    /// Staining cycle
    #[serde(default)]
    pub cycle_number: Option<i64>,
    /// Optical filter
    #[serde(default)]
    pub filter: Option<String>,
    /// Excitation wavelength in nm
    #[serde(default)]
    pub excitation_wavelength: Option<f64>,
    /// Emission wavelength in nm
    #[serde(default)]
    pub emission_wavelength: Option<f64>,
}

impl DeclaredMarker {
    /// Declare a marker by name only
    pub fn new(marker_name: &str) -> Self {
        Self {
            marker_name: marker_name.to_string(),
            ..Default::default()
        }
    }

    /// Read a declared marker table. Header names are matched without
    /// regard to case; unknown columns are ignored.
    pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Self>, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: csv::StringRecord = rdr.headers()?.iter().map(str::to_lowercase).collect();
        if !headers.iter().any(|h| h == "marker_name") {
            return Err(TableError::MissingColumn("marker_name".to_string()));
        }
        rdr.set_headers(headers);

        let mut markers = Vec::new();
        for row in rdr.deserialize() {
            markers.push(row?);
        }
        Ok(markers)
    }

    /// Read a declared marker table from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, TableError> {
        let file = File::open(path)?;
        Self::read_csv(BufReader::new(file))
    }
}

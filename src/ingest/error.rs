use crate::compat::CompatibilityError;
use crate::headers::HeaderError;

/// Errors reading cell or declared-marker tables
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error opening a table
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent
    #[error("Missing required column `{0}`")]
    MissingColumn(String),

    /// A cell could not be read as a number
    #[error("Invalid number `{value}` in column `{column}` at line {line}")]
    InvalidNumber {
        /// 1-based line in the source table
        line: u64,
        /// Header of the offending column
        column: String,
        /// The raw cell text
        value: String,
    },

    /// A row does not have one value per header
    #[error("Row {row} has {found} values, expected {expected}")]
    RowLength {
        /// 0-based row index
        row: usize,
        /// Number of headers
        expected: usize,
        /// Number of values in the row
        found: usize,
    },
}

/// Errors reported by an ingestion sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write was attempted outside a unit of work
    #[error("No transaction in progress")]
    NoTransaction,

    /// `begin` was called while a unit of work was open
    #[error("A transaction is already in progress")]
    TransactionActive,

    /// The sink refused the operation
    #[error("Sink rejected the operation: {0}")]
    Rejected(String),
}

/// Errors that can occur while ingesting a sample
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The dataset failed the compatibility gate
    #[error(transparent)]
    Compatibility(#[from] CompatibilityError),

    /// A header could not be normalized
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    /// An input table could not be read
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// The sink failed
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// A sample with the same name and tag is already stored
    #[error("Sample `{name}` (tag {tag:?}) already exists")]
    SampleExists {
        /// Sample name
        name: String,
        /// Sample tag
        tag: Option<String>,
    },

    /// A declared marker name does not resolve
    #[error("Declared marker `{0}` is not in the registry")]
    UnknownDeclaredMarker(String),

    /// A value was written to a column the feature schema does not define
    #[error("Unknown feature column `{0}`")]
    UnknownColumn(String),

    /// A value cannot be stored in its column type
    #[error("Value {value} is not valid for column `{column}`")]
    InvalidValue {
        /// Target column
        column: String,
        /// The rejected value
        value: f64,
    },

    /// Bad ingestion option
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

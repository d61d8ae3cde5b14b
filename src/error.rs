use thiserror::Error;

/// Errors raised by the regression and hypothesis-test routines.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Insufficient data: {rows} rows, {cols} parameters (need rows > parameters)")]
    InsufficientData { rows: usize, cols: usize },

    #[error("Dimension mismatch: y has {y_len} elements, X has {x_rows} rows")]
    DimensionMismatch { y_len: usize, x_rows: usize },

    #[error("Empty input: {field} cannot be empty")]
    EmptyInput { field: &'static str },

    #[error("Matrix is singular or near-singular")]
    SingularMatrix,

    #[error("Need at least two groups to compare, found {0}")]
    TooFewGroups(usize),

    #[error("Non-finite value in {field}")]
    NonFinite { field: &'static str },

    #[error("Distribution error: {0}")]
    Distribution(String),
}

pub type StatsResult<T> = Result<T, StatsError>;

/// Errors raised while fetching or interpreting the input table.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to retrieve {url}: {reason}")]
    Retrieval { url: String, reason: String },

    #[error("Input table is missing the '{0}' column")]
    MissingColumn(String),

    #[error("Row {row}, column '{column}': {reason}")]
    InvalidCell {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}

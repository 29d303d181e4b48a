//! Error types for the ingestion pipeline.
//!
//! Parse, validation and batch-size failures are caused by the uploaded file
//! and are reported back to the caller as-is. [`StorageFault`] covers
//! everything that goes wrong underneath the store and is surfaced opaquely.

use std::fmt;

use thiserror::Error;

// ---

/// Everything `ingest` can fail with.
#[derive(Debug, Error)]
pub enum IngestError {
    // ---
    #[error("malformed CSV input: {0}")]
    Malformed(#[from] MalformedInput),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("CSV file must contain between 1 and {max} lines of data")]
    BatchSize { max: usize },

    #[error("cannot aggregate an empty batch")]
    EmptyBatch,

    #[error(transparent)]
    Storage(#[from] StorageFault),
}

impl IngestError {
    /// True for errors caused by the uploaded content rather than the service.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            IngestError::Malformed(_) | IngestError::Validation(_) | IngestError::BatchSize { .. }
        )
    }
}

/// The file is not structurally a CSV of the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedInput {
    // ---
    #[error("missing required header column '{0}'")]
    MissingHeader(&'static str),

    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid date '{text}', expected yyyy-MM-ddTHH:mm:ss.fffZ")]
    InvalidDate { line: u64, text: String },

    #[error("unreadable CSV: {0}")]
    Unreadable(String),
}

/// Column a validation rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    ExecutionTime,
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Date => "Date",
            Field::ExecutionTime => "ExecutionTime",
            Field::Value => "Value",
        };
        f.write_str(name)
    }
}

/// A single rule violation. `row_index` is zero-based over the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    pub row_index: usize,
    pub field: Field,
    pub reason: String,
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} {}: {}", self.row_index + 1, self.field, self.reason)
    }
}

/// All violations found in a rejected batch, in row order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors(pub Vec<RowViolation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[RowViolation] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s): ", self.0.len())?;
        for (i, v) in self.violations().iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// The backing store failed.
#[derive(Debug, Error)]
pub enum StorageFault {
    // ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

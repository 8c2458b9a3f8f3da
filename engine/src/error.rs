//! Error types for the Booktable engine.

use crate::RecordId;
use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers to decide which
/// state to fall back to and which message to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upload rejected; the store was not touched.
    Import,
    /// Query could not be served; the working set keeps its prior state.
    Fetch,
    /// Bulk update failed partially or fully; edits are preserved.
    Save,
    /// A local edit was refused; the working set is unchanged.
    Edit,
    /// Records could not be written out as CSV.
    Export,
}

/// All possible errors from the Booktable engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Import errors
    #[error("upload is not valid UTF-8")]
    InvalidEncoding,

    #[error("malformed CSV at line {line}: {message}")]
    MalformedCsv { line: u64, message: String },

    #[error("CSV has no header row")]
    MissingHeader,

    #[error("CSV contains no data rows")]
    EmptyImport,

    // Query errors
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u64),

    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(u64),

    #[error("unknown field: {0}")]
    UnknownField(String),

    // Edit errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid value for field '{field}': {value:?}")]
    InvalidFieldValue { field: String, value: String },

    #[error("a save is already in progress")]
    SaveInProgress,

    // Store errors
    #[error("bulk update stopped after {modified} record(s): {message}")]
    PartialUpdate { modified: u64, message: String },

    // Export errors
    #[error("CSV export failed: {0}")]
    Export(String),
}

impl Error {
    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidEncoding
            | Error::MalformedCsv { .. }
            | Error::MissingHeader
            | Error::EmptyImport => ErrorKind::Import,
            Error::InvalidPage(_) | Error::InvalidLimit(_) | Error::UnknownField(_) => {
                ErrorKind::Fetch
            }
            Error::RecordNotFound(_) | Error::InvalidFieldValue { .. } | Error::SaveInProgress => {
                ErrorKind::Edit
            }
            Error::PartialUpdate { .. } => ErrorKind::Save,
            Error::Export(_) => ErrorKind::Export,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

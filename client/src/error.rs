//! Error types for the client.

use booktable_engine::ErrorKind;
use thiserror::Error;

/// Everything the controller or a source can fail with.
///
/// The first five variants mirror the engine's error taxonomy and carry a
/// message fit for display.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Import failed: {0}")]
    Import(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Save failed: {0}")]
    Save(String),

    /// The store wrote some records before the bulk update stopped.
    #[error("Save failed after {modified_count} record(s): {message}")]
    PartialSave { modified_count: u64, message: String },

    #[error("Edit rejected: {0}")]
    Edit(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<booktable_engine::Error> for ClientError {
    fn from(err: booktable_engine::Error) -> Self {
        if let booktable_engine::Error::PartialUpdate { modified, .. } = err {
            return ClientError::PartialSave {
                modified_count: modified,
                message: err.to_string(),
            };
        }
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Import => ClientError::Import(message),
            ErrorKind::Fetch => ClientError::Fetch(message),
            ErrorKind::Save => ClientError::Save(message),
            ErrorKind::Edit => ClientError::Edit(message),
            ErrorKind::Export => ClientError::Export(message),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use booktable_engine::Error;

    #[test]
    fn engine_errors_keep_their_kind() {
        assert!(matches!(
            ClientError::from(Error::EmptyImport),
            ClientError::Import(_)
        ));
        assert!(matches!(
            ClientError::from(Error::RecordNotFound("7".into())),
            ClientError::Edit(message) if message == "record not found: 7"
        ));
        assert!(matches!(
            ClientError::from(Error::InvalidLimit(0)),
            ClientError::Fetch(_)
        ));
    }

    #[test]
    fn partial_update_keeps_its_count() {
        let err = ClientError::from(Error::PartialUpdate {
            modified: 3,
            message: "deadlock".into(),
        });
        assert!(matches!(
            err,
            ClientError::PartialSave { modified_count: 3, .. }
        ));
    }
}

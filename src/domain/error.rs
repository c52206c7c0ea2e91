//! Domain error types for pairdiff.
//!
//! Nothing in the sync engine is fatal. These errors surface from the
//! document backend and the configuration layer and are logged by callers.

use thiserror::Error;

use super::aligned::DocumentId;

/// Errors raised by a document backend.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Nothing to {action} in document {document_id}")]
    HistoryEmpty {
        document_id: DocumentId,
        action: &'static str,
    },

    #[error("Invalid row range {start}..={end} for {row_count} rows")]
    InvalidRange {
        start: usize,
        end: usize,
        row_count: usize,
    },
}

/// Errors raised while reading or writing the sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

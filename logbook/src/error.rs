//! Error types for the logbook editor
//!
//! All errors use thiserror for structured error handling.
//! Collaborator errors propagate unchanged; nothing is retried.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Logbook entry not found: {0}")]
    EntryNotFound(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Logbook entry already exists: {0}")]
    DuplicateEntry(String),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Week {week} is out of range (entry has {total} weeks)")]
    WeekOutOfRange { week: usize, total: usize },

    #[error("Unsupported zoom level: {0}")]
    InvalidZoom(String),

    #[error("Logbook entry is not open for editing: {0}")]
    NotOpen(String),
}

/// Coarse classification used by the front end to decide how to report a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Store,
    NotFound,
    Render,
    Input,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::DuplicateEntry(_)
            | AppError::BlobStore(_) => ErrorKind::Store,
            AppError::EntryNotFound(_) | AppError::BlobNotFound(_) => ErrorKind::NotFound,
            AppError::Render(_) | AppError::PageOutOfRange { .. } => ErrorKind::Render,
            AppError::WeekOutOfRange { .. } | AppError::InvalidZoom(_) | AppError::NotOpen(_) => {
                ErrorKind::Input
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

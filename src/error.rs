//! Error types for blobkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BlobError
pub type Result<T> = std::result::Result<T, BlobError>;

/// Unified error type for blobkv operations
#[derive(Debug, Error)]
pub enum BlobError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Declared length or hash does not match the supplied stream
    #[error("Inconsistent stream: {0}")]
    Inconsistent(String),

    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Index Structure Errors (detected at open)
    // -------------------------------------------------------------------------
    #[error("Index corrupted: {0}")]
    CorruptIndex(String),

    #[error("Index file has invalid size: {0} bytes")]
    CorruptSize(u64),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("{0} is closed")]
    Disposed(&'static str),

    /// Another instance already holds the files open
    #[error("Files are in use by another instance: {0}")]
    IoConflict(String),

    // -------------------------------------------------------------------------
    // Platform Errors
    // -------------------------------------------------------------------------
    /// File, mapping or sync failure reported by the OS
    #[error("Platform I/O error: {0}")]
    Platform(#[from] std::io::Error),
}

impl BlobError {
    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }

    /// True for `DuplicateKey`
    pub fn is_duplicate(&self) -> bool {
        matches!(self, BlobError::DuplicateKey(_))
    }
}

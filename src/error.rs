//! Error types for rowstore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RowStoreError
pub type Result<T> = std::result::Result<T, RowStoreError>;

/// Unified error type for rowstore operations
#[derive(Debug, Error)]
pub enum RowStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Not open: {0}")]
    NotOpen(String),

    #[error("Already open: {0}")]
    AlreadyOpen(String),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Corrupted file: {0}")]
    Corrupted(String),
}

//! Storage error types.

use std::io;
use thiserror::Error;

/// Storage operation errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during storage operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Key does not resolve to an object
    #[error("File not found: {0}")]
    NotFound(String),

    /// Invalid key or path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Search pattern could not be compiled
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Failure reported by the backend client (network, permission, throttling)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Object store error
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation has no meaning for the active backend
    #[error("Operation not supported by {backend} storage: {operation}")]
    Unsupported {
        /// Backend name
        backend: &'static str,
        /// Operation name
        operation: &'static str,
    },

    /// Bulk operation was cancelled before completion
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Provider was closed and no longer holds a client
    #[error("Storage provider is closed")]
    Closed,
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
            || matches!(self, StorageError::Io(e) if e.kind() == io::ErrorKind::NotFound)
            || matches!(self, StorageError::ObjectStore(object_store::Error::NotFound { .. }))
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StorageError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied)
    }

    /// Check if the active backend cannot perform the operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StorageError::Unsupported { .. })
    }

    pub(crate) fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        StorageError::Unsupported { backend, operation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = StorageError::NotFound("test".to_string());
        assert!(err.is_not_found());

        let io_err = StorageError::Io(io::Error::new(io::ErrorKind::NotFound, "not found"));
        assert!(io_err.is_not_found());

        let backend = StorageError::Backend("timeout".to_string());
        assert!(!backend.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound("avatars/placeholder.png".to_string());
        assert_eq!(err.to_string(), "File not found: avatars/placeholder.png");

        let err = StorageError::unsupported("s3", "undelete");
        assert_eq!(
            err.to_string(),
            "Operation not supported by s3 storage: undelete"
        );
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_invalid_pattern_from_regex() {
        let err: StorageError = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(matches!(err, StorageError::InvalidPattern(_)));
    }
}

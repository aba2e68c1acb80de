//! Error handling for cmdpal-store
//!
//! Wraps cmdpal-core ExError with store-specific helpers

use std::path::Path;

use cmdpal_core::errors::{ExError, ExErrorKind, PaletteError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a cache integrity error (copied bytes differ from the source)
pub fn cache_digest_mismatch(path: &Path, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op("cache_refresh")
        .with_path(path)
        .with_message(format!(
            "Cached copy digest {} does not match source digest {}",
            actual, expected
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an IO error that names the file involved
pub fn io_error_at(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    io_error(operation, err).with_path(path)
}

/// Attach operation and path context to a manifest document error
pub fn manifest_error(operation: &str, path: &Path, err: PaletteError) -> ExError {
    ExError::from(err).with_op(operation).with_path(path)
}

/// Create a serialization error for a stored value
pub fn stored_value_error(key: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("state_get")
        .with_message(format!("Stored value for '{}' is not valid JSON: {}", key, err))
}

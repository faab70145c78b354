//! Error types for VellumDB.

use thiserror::Error;

/// Result type alias using VellumError.
pub type Result<T> = std::result::Result<T, VellumError>;

/// Errors that can occur in VellumDB operations.
#[derive(Debug, Error)]
pub enum VellumError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page corrupted at position {position_id}: {reason}")]
    PageCorrupted { position_id: u32, reason: String },

    #[error("Position {position_id} is beyond end of file (last position {last_position_id})")]
    PositionOutOfBounds {
        position_id: u32,
        last_position_id: u32,
    },

    // Memory errors
    #[error("Memory factory failed to allocate a page buffer")]
    AllocationFailed,

    #[error("Page cache full, unable to insert page at position {position_id}")]
    CacheFull { position_id: u32 },

    // Log errors
    #[error("Log write failed: {0}")]
    LogWriteFailed(String),

    #[error("Checkpoint failed: {0}")]
    CheckpointFailed(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Internal errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: VellumError = io_err.into();
        assert!(matches!(err, VellumError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_page_corrupted_display() {
        let err = VellumError::PageCorrupted {
            position_id: 42,
            reason: "checksum mismatch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Page corrupted at position 42: checksum mismatch"
        );
    }

    #[test]
    fn test_position_out_of_bounds_display() {
        let err = VellumError::PositionOutOfBounds {
            position_id: 100,
            last_position_id: 10,
        };
        assert_eq!(
            err.to_string(),
            "Position 100 is beyond end of file (last position 10)"
        );
    }

    #[test]
    fn test_allocation_failed_display() {
        let err = VellumError::AllocationFailed;
        assert_eq!(
            err.to_string(),
            "Memory factory failed to allocate a page buffer"
        );
    }

    #[test]
    fn test_cache_full_display() {
        let err = VellumError::CacheFull { position_id: 17 };
        assert_eq!(
            err.to_string(),
            "Page cache full, unable to insert page at position 17"
        );
    }

    #[test]
    fn test_log_errors_display() {
        let err = VellumError::LogWriteFailed("disk full".to_string());
        assert_eq!(err.to_string(), "Log write failed: disk full");

        let err = VellumError::CheckpointFailed("partial plan".to_string());
        assert_eq!(err.to_string(), "Checkpoint failed: partial plan");
    }

    #[test]
    fn test_invariant_violation_display() {
        let err = VellumError::InvariantViolation("stale page in cache".to_string());
        assert_eq!(err.to_string(), "Invariant violation: stale page in cache");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(VellumError::Internal("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VellumError>();
    }
}

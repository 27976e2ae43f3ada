//! Unified error handling for the motion-tracker library.
//!
//! This module provides a consistent error type for all tracker operations,
//! replacing mixed error handling patterns (Option, panic, silent failures).

use std::fmt;

/// Unified error type for motion-tracker operations.
#[derive(Debug, Clone)]
pub enum TrackerError {
    /// Fix has invalid or non-finite coordinates/accuracy
    InvalidFix {
        message: String,
    },
    /// Configuration is inconsistent or out of range
    ConfigError { message: String },
    /// Persisted snapshot could not be read at all (not even leniently)
    CorruptSnapshot {
        key: String,
        message: String,
    },
    /// Snapshot store read/write error
    StorageError { message: String },
    /// Operation invalid for the session's current status
    SessionStateError {
        expected: String,
        actual: String,
    },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::InvalidFix { message } => {
                write!(f, "Invalid location fix: {}", message)
            }
            TrackerError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TrackerError::CorruptSnapshot { key, message } => {
                write!(f, "Snapshot '{}' is corrupt: {}", key, message)
            }
            TrackerError::StorageError { message } => {
                write!(f, "Storage error: {}", message)
            }
            TrackerError::SessionStateError { expected, actual } => {
                write!(
                    f,
                    "Session is '{}', operation requires '{}'",
                    actual, expected
                )
            }
            TrackerError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TrackerError {}

/// Result type alias for motion-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a storage error.
    fn ok_or_storage(self, message: &str) -> Result<T>;

    /// Convert Option to Result with a generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_storage(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::StorageError {
            message: message.to_string(),
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::CorruptSnapshot {
            key: "fitapp_u1_s1".to_string(),
            message: "not a JSON object".to_string(),
        };
        assert!(err.to_string().contains("fitapp_u1_s1"));
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_storage("store unavailable");
        assert!(matches!(result, Err(TrackerError::StorageError { .. })));
    }
}

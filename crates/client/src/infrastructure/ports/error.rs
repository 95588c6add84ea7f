//! Error types for port operations.

use compass_domain::DomainError;

/// Storage failures surfaced by a [`FileManager`](super::FileManager).
///
/// Lookups that find nothing are not errors: they return `Ok(None)` or an
/// empty collection. `Clone` so the last failure can sit in observable store
/// state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FileManagerError {
    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing store has no room left.
    #[error("Storage quota exceeded in {operation}")]
    QuotaExceeded { operation: &'static str },

    /// The backing store is damaged or not a database.
    #[error("Storage corrupted in {operation}: {message}")]
    Corrupted {
        operation: &'static str,
        message: String,
    },

    /// The selected file manager does not provide this capability.
    #[error("{operation} is not supported by this file manager")]
    Unsupported { operation: &'static str },

    /// Entity rejected by a domain invariant before it was written.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl FileManagerError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn corrupted(operation: &'static str, message: impl ToString) -> Self {
        Self::Corrupted {
            operation,
            message: message.to_string(),
        }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Whether re-issuing the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::QuotaExceeded { .. })
    }
}

impl From<DomainError> for FileManagerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Parse(msg) | DomainError::InvalidId(msg) => Self::Serialization(msg),
            DomainError::InvalidTimestamp(msg) => Self::Serialization(msg),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FileManagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The store manager has been closed.
    #[error("store manager is closed")]
    Closed,

    /// The backend transaction already committed or rolled back.
    #[error("backend transaction already finished")]
    TransactionFinished,

    /// A failure that may succeed when retried (timeouts, lock contention).
    #[error("temporary backend failure: {0}")]
    Temporary(String),

    /// A failure that will not succeed when retried.
    #[error("permanent backend failure: {0}")]
    Permanent(String),
}

impl StorageError {
    /// Creates a temporary failure.
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::Temporary(message.into())
    }

    /// Creates a permanent failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Returns true if retrying the operation may succeed.
    ///
    /// Retrying is the caller's decision; nothing in ArborDB retries on its own.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_is_retriable() {
        assert!(StorageError::temporary("lock timeout").is_temporary());
        assert!(!StorageError::permanent("disk gone").is_temporary());
        assert!(!StorageError::Closed.is_temporary());
    }

    #[test]
    fn display_includes_message() {
        let err = StorageError::permanent("disk gone");
        assert_eq!(err.to_string(), "permanent backend failure: disk gone");
    }
}

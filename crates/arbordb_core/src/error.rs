//! Error types for the ArborDB transaction engine.

use crate::schema::{DataType, RelationCategory};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ArborDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backend transaction or store manager error.
    #[error("backend error: {0}")]
    Storage(#[from] arbordb_storage::StorageError),

    /// Value or record could not be (de)serialized.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// A relation type exists under the name but has the wrong kind.
    #[error("relation type '{name}' is of kind {actual}, expected {expected}")]
    TypeKindMismatch {
        /// Name that was resolved.
        name: String,
        /// Kind the caller asked for.
        expected: RelationCategory,
        /// Kind the existing type has.
        actual: RelationCategory,
    },

    /// The name is undefined and the schema maker refuses to create it.
    #[error("{category} '{name}' does not exist and automatic schema creation is disabled")]
    SchemaCreationDisallowed {
        /// Requested name.
        name: String,
        /// Requested schema category.
        category: String,
    },

    /// Two transactions defined the same schema name concurrently.
    #[error("schema element '{name}' was defined concurrently")]
    SchemaConflict {
        /// Conflicting name.
        name: String,
    },

    /// Invalid schema definition or usage.
    #[error("schema violation: {message}")]
    SchemaViolation {
        /// Description of the violation.
        message: String,
    },

    /// Property value does not match the key's data type.
    #[error("value for property key '{key}' must be {expected}, got {actual}")]
    DataTypeMismatch {
        /// Property key name.
        key: String,
        /// Declared data type.
        expected: DataType,
        /// Data type of the supplied value.
        actual: DataType,
    },

    /// An edge would violate its label's multiplicity.
    #[error("edge label '{label}' does not allow another edge: {message}")]
    MultiplicityViolation {
        /// Edge label name.
        label: String,
        /// Description of the violation.
        message: String,
    },

    /// A unique index already holds the value for another vertex.
    #[error("unique index '{index}' already contains the indexed value")]
    UniquenessViolation {
        /// Index name.
        index: String,
    },

    /// A custom vertex id was supplied but the graph does not allow them.
    #[error("custom vertex ids are not enabled for this graph")]
    CustomIdNotAllowed,

    /// The graph requires custom vertex ids but none was supplied.
    #[error("custom vertex ids are enabled, a vertex id must be provided")]
    CustomIdRequired,

    /// The supplied custom vertex id is not usable.
    #[error("invalid custom vertex id {id}: {reason}")]
    InvalidCustomId {
        /// The rejected id.
        id: u64,
        /// Why it was rejected.
        reason: String,
    },

    /// The vertex does not exist or has been removed.
    #[error("vertex {id} not found")]
    VertexNotFound {
        /// The vertex id.
        id: u64,
    },

    /// Attempted a mutation in a read-only transaction.
    #[error("cannot mutate the graph in a read-only transaction")]
    ReadOnly,

    /// The transaction has already committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,

    /// A single-threaded transaction was used from a foreign thread.
    #[error("single-threaded transaction accessed from a different thread")]
    ThreadConfinement,

    /// The graph has been closed.
    #[error("graph is closed")]
    GraphClosed,

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a type kind mismatch error.
    pub fn type_kind_mismatch(
        name: impl Into<String>,
        expected: RelationCategory,
        actual: RelationCategory,
    ) -> Self {
        Self::TypeKindMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Creates a schema creation disallowed error.
    pub fn schema_creation_disallowed(
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self::SchemaCreationDisallowed {
            name: name.into(),
            category: category.into(),
        }
    }

    /// Creates a schema violation error.
    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            message: message.into(),
        }
    }

    /// Creates a multiplicity violation error.
    pub fn multiplicity_violation(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MultiplicityViolation {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid custom id error.
    pub fn invalid_custom_id(id: u64, reason: impl Into<String>) -> Self {
        Self::InvalidCustomId {
            id,
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors that leave the transaction open and usable.
    ///
    /// Validation failures are local to the call; backend and lifecycle
    /// errors are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TypeKindMismatch { .. }
                | Self::SchemaCreationDisallowed { .. }
                | Self::SchemaViolation { .. }
                | Self::DataTypeMismatch { .. }
                | Self::MultiplicityViolation { .. }
                | Self::CustomIdNotAllowed
                | Self::CustomIdRequired
                | Self::InvalidCustomId { .. }
                | Self::VertexNotFound { .. }
                | Self::ReadOnly
        )
    }
}

//! Error types for the access control engine

use thiserror::Error;

/// Result type alias for access control operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors raised by grant ingestion, role extension, and condition evaluation
#[derive(Debug, Error)]
pub enum AccessError {
    /// Grant input is neither the role-keyed object shape nor the flat list shape,
    /// or a record inside it is malformed
    #[error("Invalid grants input: {0}")]
    InvalidGrants(String),

    /// A grant record or query lacks a required field
    #[error("Missing required field '{field}' in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: &'static str,
    },

    /// Extending would create a cycle, or the extender role does not exist
    #[error("Cannot extend role '{role}' by '{extender}': {reason}")]
    CircularExtension {
        role: String,
        extender: String,
        reason: String,
    },

    /// AND/OR condition given a non-array, non-mapping operand, or a leaf
    /// predicate given args of the wrong shape
    #[error("Invalid condition arguments: {0}")]
    InvalidConditionArgs(String),

    /// Condition references a predicate name that is not registered
    #[error("Unknown condition predicate '{0}'")]
    UnknownPredicate(String),

    /// A custom predicate returned an error; aborts the enclosing evaluation
    #[error("Predicate '{name}' failed")]
    PredicateFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

//! Error types for the GraphFrame compiler

use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning frame state into Cypher
///
/// The compiler only fails on malformed input to itself. Nothing here
/// describes a database-side failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A filter key could not be split into a usable field
    #[error("Invalid filter `{key}`: {reason}")]
    InvalidFilter {
        /// Filter key as supplied by the caller
        key: String,
        /// Why the key was rejected
        reason: String,
    },

    /// Operator suffix outside the recognized set (strict policy only)
    #[error("Unknown operator `{operator}` in filter `{key}`")]
    UnknownOperator {
        /// Filter key as supplied by the caller
        key: String,
        /// The unrecognized operator text
        operator: String,
    },

    /// A selected or ordered field cannot be rendered in this query shape
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField {
        /// Field as supplied by the caller
        field: String,
        /// Why the field was rejected
        reason: String,
    },

    /// An upsert record lacks one of its declared key fields
    #[error("{role} field '{field}' not found in data item: {record}")]
    MissingKeyField {
        /// "Key", "Source key", "Destination key" or "Relationship key"
        role: &'static str,
        /// Missing field name
        field: String,
        /// The offending record, rendered as JSON
        record: String,
    },

    /// Relationship upsert without a rel key under `require_rel_key`
    #[error(
        "Relationship upsert of `{rel_type}` requires rel_key when rel_uniqueness_policy='require_rel_key'"
    )]
    MissingRelKey {
        /// Relationship type being upserted
        rel_type: String,
    },

    /// Operation that would drop the traversal a back query is scoped by
    #[error("`{operation}` is not supported after back(); the origin traversal cannot be carried into it")]
    UnsupportedAfterBack {
        /// Frame method that was called
        operation: &'static str,
    },
}

impl Error {
    /// Create an invalid filter error
    pub fn invalid_filter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from validating upsert input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingKeyField { .. } | Self::MissingRelKey { .. })
    }
}

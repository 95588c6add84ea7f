//! Unified error type for the domain layer.

use thiserror::Error;

/// Error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Required fields missing or values out of range
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Content points at a different parent than the container it is added to
    #[error("Ownership mismatch: {entity_type} {id} belongs to {owner}, not {parent}")]
    Ownership {
        entity_type: &'static str,
        id: String,
        owner: String,
        parent: String,
    },

    /// Parse error for stored values
    #[error("Parse error: {0}")]
    Parse(String),

    /// `updated_at` earlier than `created_at`
    #[error("Invalid timestamps: {0}")]
    InvalidTimestamp(String),
}

impl DomainError {
    /// Creates a validation error.
    ///
    /// Used when a draft or value object is missing a required field:
    ///
    /// ```ignore
    /// if username.trim().is_empty() {
    ///     return Err(DomainError::validation("username cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn ownership(
        entity_type: &'static str,
        id: impl ToString,
        owner: impl ToString,
        parent: impl ToString,
    ) -> Self {
        Self::Ownership {
            entity_type,
            id: id.to_string(),
            owner: owner.to_string(),
            parent: parent.to_string(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_timestamp(msg: impl Into<String>) -> Self {
        Self::InvalidTimestamp(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

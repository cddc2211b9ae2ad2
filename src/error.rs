//! Error types for the memory core.
//!
//! The store, lifecycle and manager return [`MemoryError`]. Persistence
//! collaborators speak `anyhow` and are folded into `LoadFailed` /
//! `PersistFailed` at the manager boundary.

use thiserror::Error;

/// Result type alias using the memory core's error type.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// What kind of reference could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    Item,
    EdgeEndpoint,
}

impl std::fmt::Display for MissingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::EdgeEndpoint => write!(f, "edge endpoint"),
        }
    }
}

/// Errors surfaced by memory operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Malformed input, rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reference to an item that does not exist.
    #[error("Not found: {kind} '{id}'")]
    NotFound { kind: MissingKind, id: String },

    /// Structural corruption (e.g. a dangling edge). Algorithms log and skip
    /// these instead of returning them.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The persistence collaborator could not produce a state.
    #[error("Failed to load memory state: {0}")]
    LoadFailed(String),

    /// A mutation could not be made durable; the in-memory view was rolled back.
    #[error("Failed to persist memory state: {0}")]
    PersistFailed(String),
}

impl MemoryError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error for an item id.
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: MissingKind::Item,
            id: id.into(),
        }
    }

    /// Create a not-found error for an edge endpoint.
    pub fn endpoint_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: MissingKind::EdgeEndpoint,
            id: id.into(),
        }
    }

    /// True for `NotFound` errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for `Validation` errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::item_not_found("m1");
        assert_eq!(err.to_string(), "Not found: item 'm1'");
        assert!(err.is_not_found());

        let err = MemoryError::endpoint_not_found("m2");
        assert_eq!(err.to_string(), "Not found: edge endpoint 'm2'");

        let err = MemoryError::validation("importance out of range");
        assert!(err.is_validation());
        assert!(err.to_string().contains("importance out of range"));
    }
}

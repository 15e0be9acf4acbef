//! Error taxonomy for the queue matching engine
//!
//! Every operation returns a discriminated error so callers (and the
//! gateway's HTTP mapping) can tell "bad input" from "bad state" from
//! "unknown id" without parsing messages.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Rejected at enqueue time; the item is never created.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// The current state does not permit the attempted transition.
    /// State is left unchanged.
    #[error("Invalid transition for {entity}: {from} -> {attempted}")]
    InvalidTransition {
        entity: String,
        from: String,
        attempted: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Lost a race to claim a candidate during matching. Retried once
    /// internally; never surfaced through enqueue.
    #[error("Candidate was claimed by a concurrent match attempt")]
    ConcurrencyConflict,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Validation error helper
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Invalid-transition error helper, naming the attempted and actual states
    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl ToString,
        attempted: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity: entity.into(),
            from: from.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// Not-found error helper
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = EngineError::validation("amount", "must be positive");
        assert_eq!(err.to_string(), "Validation failed for amount: must be positive");
    }

    #[test]
    fn test_invalid_transition_names_both_states() {
        let err = EngineError::invalid_transition("match", "PENDING", "COMPLETED");
        let msg = err.to_string();
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("COMPLETED"));
    }

    #[test]
    fn test_not_found_error() {
        let err = EngineError::not_found("item", "abc-123");
        assert!(err.to_string().contains("abc-123"));
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}

//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! enabling consistent error handling without forcing adapters to use String or anyhow.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values, caller misuse)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A move or purchase costs more energy than remains.
    ///
    /// This is an expected, recoverable condition: callers check for it and
    /// offer the player a different choice.
    #[error("Insufficient energy: {required} required, {available} available")]
    InsufficientEnergy { required: u32, available: u32 },
}

impl DomainError {
    /// Creates a validation error for caller misuse.
    ///
    /// Use this when domain invariants or constraints are violated:
    /// - Values are outside allowed ranges
    /// - Required inputs are zero or empty
    /// - Generation parameters are out of bounds
    ///
    /// # Example
    /// ```ignore
    /// if steps == 0 {
    ///     return Err(DomainError::validation("A run needs at least one step"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    /// Create an insufficient energy error
    pub fn insufficient_energy(required: u32, available: u32) -> Self {
        Self::InsufficientEnergy {
            required,
            available,
        }
    }

    /// Check if this is the recoverable insufficient-energy condition.
    pub fn is_insufficient_energy(&self) -> bool {
        matches!(self, Self::InsufficientEnergy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("steps cannot be zero");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: steps cannot be zero");
    }

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("DungeonNode", "123e4567-e89b-12d3-a456-426614174000");
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(err.to_string().contains("DungeonNode"));
        assert!(err.to_string().contains("123e4567"));
    }

    #[test]
    fn test_insufficient_energy_error() {
        let err = DomainError::insufficient_energy(1500, 1000);
        assert!(err.is_insufficient_energy());
        assert_eq!(
            err.to_string(),
            "Insufficient energy: 1500 required, 1000 available"
        );
    }

    #[test]
    fn test_invalid_state_transition_error() {
        let err = DomainError::invalid_state_transition("completed -> active");
        assert!(!err.is_insufficient_energy());
        assert_eq!(err.to_string(), "Invalid state transition: completed -> active");
    }
}

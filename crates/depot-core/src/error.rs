//! # Error Types
//!
//! Rejections: the request was understood and refused. Nothing in this
//! module describes a store failure; those live in `depot-db`.
//!
//! ```text
//! ValidationError ──► CoreError::Validation
//!                     CoreError::NotFound           unknown item/location/user/record
//!                     CoreError::InsufficientStock  balance below the decrement
//!                     CoreError::AlreadyReturned    borrow record not outstanding
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// A request the ledger refused.
///
/// These are recoverable for the caller: they carry enough detail to
/// correct the input and retry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Dangling id, unknown scanned code, or a return against an id that is
    /// not a borrow record.
    #[error("{entity} not found: {reference}")]
    NotFound { entity: String, reference: String },

    /// Stock-out or borrow of more than the pair holds. `available` is the
    /// balance read inside the rejected transaction.
    #[error(
        "Insufficient stock for item {item_id} at location {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        item_id: String,
        location_id: String,
        available: i64,
        requested: i64,
    },

    /// The borrow record is no longer in `borrowed` status.
    #[error("Borrow record {record_id} has already been returned")]
    AlreadyReturned { record_id: String },
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, reference: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            reference: reference.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Raised before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// e.g. `min_stock` outside `0..=i64::MAX`.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Whitespace or control characters in a code, unparseable dates.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Item code, location code, username or category name already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item_id: "item-1".to_string(),
            location_id: "loc-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for item item-1 at location loc-1: available 3, requested 5"
        );

        let err = CoreError::not_found("Item", "code SCREW-M4");
        assert_eq!(err.to_string(), "Item not found: code SCREW-M4");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

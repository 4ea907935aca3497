//! # Error Types
//!
//! Domain-specific error types for dukan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukan-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dukan-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  dukan-sync errors (separate crate)                                    │
//! │  └── SyncError        - Queue processing / transport failures          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError / DbError → SyncError / CLI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A permission name did not match any known permission.
    ///
    /// ## When This Occurs
    /// - CLI `user grant alice manage_everything`
    /// - A stored permission list written by a newer client
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// A user lacks a permission required for an operation.
    #[error("User {username} lacks permission {permission}")]
    PermissionDenied {
        username: String,
        permission: String,
    },

    /// User account is deactivated.
    #[error("User {0} is inactive")]
    InactiveUser(String),

    /// A sync queue status string is not one of the known states.
    #[error("Unknown sync status: {0}")]
    UnknownSyncStatus(String),

    /// A sync queue action string is not one of create/update/delete.
    #[error("Unknown sync action: {0}")]
    UnknownSyncAction(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet format requirements.
/// Used for early validation before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid GSTIN).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Numeric update divides by zero.
    #[error("{field} cannot be divided by zero")]
    DivisionByZero { field: String },

    /// Operation is not supported for this column (e.g. SUM over text).
    #[error("{operation} is not supported on {field}")]
    UnsupportedOperation { field: String, operation: String },
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
        let err = CoreError::PermissionDenied {
            username: "ravi".to_string(),
            permission: "void_bill".to_string(),
        };
        assert_eq!(err.to_string(), "User ravi lacks permission void_bill");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::DivisionByZero {
            field: "stock".to_string(),
        };
        assert_eq!(err.to_string(), "stock cannot be divided by zero");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

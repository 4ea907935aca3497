//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        ValidationError (dukan-core)        │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context, categorization and codes        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (dukan-sync) / anyhow (CLI)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stable Codes
//! ```text
//! P2002  UniqueViolation       "Unique constraint failed on sku"
//! P2003  ForeignKeyViolation   parent row missing or still referenced
//! P2025  NotFound              record to read/update/delete is missing
//! ```

use thiserror::Error;

use dukan_core::{CoreError, ValidationError};

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `get` / `update_fields` / `delete` on an unknown ID
    /// - `Sale` lookup by an unused bill number
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU or barcode
    /// - Duplicate username, category name, customer phone
    /// - Any UNIQUE index violation
    #[error("Unique constraint failed on {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent category, product, variant, sale or user
    /// - Deleting a parent that still has children
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Input rejected before reaching SQLite.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule failure (permission, inactive user, unknown enum value).
    #[error(transparent)]
    Domain(CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Transaction exceeded its wait or run time and was rolled back.
    #[error("Transaction timed out after {0:?}")]
    TransactionTimeout(std::time::Duration),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
        }
    }

    /// Stable code for known request errors.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DbError::UniqueViolation { .. } => Some("P2002"),
            DbError::ForeignKeyViolation { .. } => Some("P2003"),
            DbError::NotFound { .. } => Some("P2025"),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => DbError::Validation(v),
            other => DbError::Domain(other),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                // "FOREIGN KEY constraint failed"
                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: unique_fields(columns),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON: {}", err))
    }
}

/// `"ProductVariant.sku, ProductVariant.barcode"` → `"sku, barcode"`.
fn unique_fields(columns: &str) -> String {
    columns
        .split(", ")
        .map(|c| c.rsplit('.').next().unwrap_or(c).trim())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_parsing() {
        assert_eq!(unique_fields("ProductVariant.sku"), "sku");
        assert_eq!(unique_fields("T.a, T.b"), "a, b");
    }

    #[test]
    fn test_codes_and_messages() {
        let err = DbError::duplicate("barcode");
        assert_eq!(err.code(), Some("P2002"));
        assert_eq!(err.to_string(), "Unique constraint failed on barcode");
        assert_eq!(DbError::not_found("Sale", "x").code(), Some("P2025"));
        assert_eq!(DbError::PoolExhausted.code(), None);
    }

    #[test]
    fn test_core_validation_unwrapped() {
        let err: DbError = CoreError::Validation(ValidationError::Required {
            field: "name".to_string(),
        })
        .into();
        assert!(matches!(err, DbError::Validation(_)));
        let err: DbError = CoreError::InactiveUser("bob".to_string()).into();
        assert!(matches!(err, DbError::Domain(_)));
    }
}

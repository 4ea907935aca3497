//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  MissingDeviceId│  │  Timeout        │  │  DeserializationFailed  │ │
//! │  │  MissingEndpoint│  │  HttpStatus     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  DatabaseError  │  │  ShuttingDown   │                              │
//! │  │                 │  │  ChannelError   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID (required for sync).
    #[error("Device ID not configured")]
    MissingDeviceId,

    /// No endpoint to push to.
    #[error("Sync endpoint not configured. Set [sync] endpoint or DUKAN_SYNC_ENDPOINT")]
    MissingEndpoint,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never got a response.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timeout.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// The endpoint answered with a non-success status.
    #[error("Sync endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a batch.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to parse the endpoint's response.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database query failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Processor is shutting down.
    #[error("Sync processor is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<dukan_db::DbError> for SyncError {
    fn from(err: dukan_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the push can be retried as-is later.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts
    /// - HTTP 408, 429 and 5xx
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Other HTTP statuses (bad token, bad request)
    /// - Protocol errors
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::HttpStatus { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingDeviceId
                | SyncError::MissingEndpoint
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("connection refused".into()).is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::HttpStatus { status: 503, body: String::new() }.is_retryable());
        assert!(SyncError::HttpStatus { status: 429, body: String::new() }.is_retryable());

        assert!(!SyncError::HttpStatus { status: 401, body: String::new() }.is_retryable());
        assert!(!SyncError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!SyncError::MissingEndpoint.is_retryable());
        assert!(SyncError::MissingEndpoint.is_config_error());
    }

    #[test]
    fn test_db_error_conversion() {
        let err: SyncError = dukan_db::DbError::not_found("SyncQueue", "abc-123").into();
        assert!(matches!(err, SyncError::DatabaseError(_)));
        assert!(err.to_string().contains("abc-123"));
    }
}

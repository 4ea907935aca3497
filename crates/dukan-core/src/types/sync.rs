//! Sync queue entries.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   enqueue ──► pending ──claim──► processing ──accepted──► completed     │
//! │                  ▲                    │                                 │
//! │                  │   rejected, retryCount + 1 < max                     │
//! │                  └────────────────────┤                                 │
//! │                                       │ retryCount + 1 >= max           │
//! │                                       ▼                                 │
//! │                                    failed ──retry_failed──► pending     │
//! │                                                                         │
//! │   processing ──(crash, reset_processing on start)──► pending            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_text;

// =============================================================================
// Sync Action
// =============================================================================

/// What happened to the row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        SyncAction::from_str(s.trim()).map_err(|_| CoreError::UnknownSyncAction(s.to_string()))
    }
}

// =============================================================================
// Sync Status
// =============================================================================

/// Where the entry is in its lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncStatus {
    /// Waiting to be pushed.
    #[default]
    Pending,
    /// Claimed by a processor.
    Processing,
    /// Accepted by the remote side.
    Completed,
    /// Retry limit reached.
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        SyncStatus::from_str(s.trim()).map_err(|_| CoreError::UnknownSyncStatus(s.to_string()))
    }
}

// =============================================================================
// Sync Queue Entry
// =============================================================================

/// One row of the `SyncQueue` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    pub id: String,
    pub action: SyncAction,

    /// Table the change belongs to (`Product`, `Sale`, ...).
    pub model: String,

    /// JSON text of the row, or `{"id": ...}` for deletes.
    pub data: String,

    pub status: SyncStatus,
    pub retry_count: i64,

    /// Last error reported for this entry.
    pub error: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SyncQueueEntry {
    /// Parses `data`.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.data)
    }
}

/// Input for enqueuing a change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSyncQueueEntry {
    pub action: SyncAction,
    pub model: String,
    pub data: String,
}

impl NewSyncQueueEntry {
    /// Builds an entry whose `data` is `row` serialized as JSON.
    pub fn for_row<T: Serialize>(
        action: SyncAction,
        model: impl Into<String>,
        row: &T,
    ) -> serde_json::Result<Self> {
        Ok(NewSyncQueueEntry {
            action,
            model: model.into(),
            data: serde_json::to_string(row)?,
        })
    }

    /// A delete entry, `{"id": ...}`.
    pub fn deleted(model: impl Into<String>, id: &str) -> Self {
        NewSyncQueueEntry {
            action: SyncAction::Delete,
            model: model.into(),
            data: serde_json::json!({ "id": id }).to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("model", &self.model, 100)?;
        serde_json::from_str::<serde_json::Value>(&self.data).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "data".to_string(),
                reason: format!("must be JSON: {}", e),
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!(SyncStatus::Processing.as_str(), "processing");
        assert_eq!(SyncStatus::parse("failed").unwrap(), SyncStatus::Failed);
        assert!(matches!(
            SyncStatus::parse("exploded"),
            Err(CoreError::UnknownSyncStatus(_))
        ));
        assert_eq!(SyncStatus::default(), SyncStatus::Pending);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(SyncAction::parse("delete").unwrap(), SyncAction::Delete);
        assert!(matches!(
            SyncAction::parse("upsert"),
            Err(CoreError::UnknownSyncAction(_))
        ));
        assert_eq!(
            serde_json::to_string(&SyncAction::Create).unwrap(),
            r#""create""#
        );
    }

    #[test]
    fn test_deleted_entry_data() {
        let entry = NewSyncQueueEntry::deleted("Customer", "c-1");
        assert_eq!(entry.action, SyncAction::Delete);
        assert_eq!(entry.data, r#"{"id":"c-1"}"#);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_for_row_serializes() {
        #[derive(Serialize)]
        struct Row {
            id: &'static str,
        }
        let entry = NewSyncQueueEntry::for_row(SyncAction::Create, "Category", &Row { id: "k" })
            .unwrap();
        assert_eq!(entry.data, r#"{"id":"k"}"#);

        let bad = NewSyncQueueEntry {
            action: SyncAction::Update,
            model: "Category".to_string(),
            data: "not json".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}

//! Audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{validate_text, validate_uuid};

/// Something a user (or the system, when `user_id` is `None`) did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,

    /// Short verb such as `sale.void` or `user.login`.
    pub action: String,

    /// Free-text or JSON details.
    pub details: String,

    /// Set to NULL when the user is deleted.
    pub user_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditLog {
    pub action: String,
    pub details: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl NewAuditLog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("action", &self.action, 100)?;
        if let Some(user_id) = &self.user_id {
            validate_uuid(user_id)?;
        }
        Ok(())
    }
}

//! Audit trail repository.

use chrono::Utc;
use tracing::debug;

use dukan_core::{new_id, AuditLog, NewAuditLog, ValidationError};

use super::{Insertable, Repository};
use crate::error::DbResult;
use crate::query::{Filter, FindMany, OrderBy};
use crate::schema::AuditLogField;

impl Insertable for NewAuditLog {
    type Row = AuditLog;

    fn validate(&self) -> Result<(), ValidationError> {
        NewAuditLog::validate(self)
    }

    fn into_row(self) -> DbResult<AuditLog> {
        Ok(AuditLog {
            id: new_id(),
            action: self.action,
            details: self.details,
            user_id: self.user_id,
            created_at: Utc::now(),
        })
    }
}

impl<'c> Repository<'c, AuditLog> {
    /// Records one action. `user_id` is `None` for system actions.
    pub async fn log(
        &mut self,
        action: &str,
        details: impl Into<String>,
        user_id: Option<&str>,
    ) -> DbResult<AuditLog> {
        debug!(action, user_id, "Writing audit entry");
        self.create(NewAuditLog {
            action: action.to_string(),
            details: details.into(),
            user_id: user_id.map(str::to_string),
        })
        .await
    }

    /// Newest entries first.
    pub async fn recent(&mut self, limit: i64) -> DbResult<Vec<AuditLog>> {
        self.find_many(
            FindMany::new()
                .order_by(OrderBy::desc(AuditLogField::CreatedAt))
                .take(limit),
        )
        .await
    }

    pub async fn for_user(&mut self, user_id: &str, limit: i64) -> DbResult<Vec<AuditLog>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(AuditLogField::UserId, user_id))
                .order_by(OrderBy::desc(AuditLogField::CreatedAt))
                .take(limit),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_log_and_recent() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;

        db.audit_logs().log("app.start", "", None).await.unwrap();
        db.audit_logs()
            .log("sale.void", r#"{"billNo":7}"#, Some(user.id.as_str()))
            .await
            .unwrap();

        let recent = db.audit_logs().recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "sale.void");

        let mine = db.audit_logs().for_user(&user.id, 10).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].details, r#"{"billNo":7}"#);
    }

    #[tokio::test]
    async fn test_user_delete_keeps_entries() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;
        let entry = db.audit_logs().log("user.login", "", Some(user.id.as_str())).await.unwrap();

        db.users().delete(&user.id).await.unwrap();

        let kept = db.audit_logs().get(&entry.id).await.unwrap();
        assert_eq!(kept.user_id, None);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let db = fixtures::db().await;
        let err = db
            .audit_logs()
            .log("user.login", "", Some(dukan_core::new_id().as_str()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("P2003"));
    }
}

//! # Sync Queue Repository
//!
//! The outbox that feeds the sync processor.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL WRITE (e.g. db.sales().create_with_items(..))                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. INSERT INTO "Sale" ... RETURNING *                          │   │
//! │  │  2. INSERT INTO "SyncQueue" (action, model, data)               │   │
//! │  │     VALUES ('create', 'Sale', <row JSON>)                       │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← both land or neither does                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            OUTBOX PROCESSOR (dukan-sync)                        │   │
//! │  │                                                                 │   │
//! │  │  1. claim_pending(n)      pending → processing, oldest first    │   │
//! │  │  2. push batch to the remote target                             │   │
//! │  │  3. accepted: mark_completed                                    │   │
//! │  │     rejected: mark_failed (→ pending, or failed at the limit)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes to `SyncQueue` itself are never captured.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use dukan_core::{NewSyncQueueEntry, SyncQueueEntry, SyncStatus};

use super::Repository;
use crate::error::{DbError, DbResult};
use crate::ops;
use crate::query::{Assignment, Filter, FindMany, GroupBy, OrderBy};
use crate::schema::SyncQueueField as Field;

/// Number of queue entries in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl SyncQueueStats {
    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

impl<'c> Repository<'c, SyncQueueEntry> {
    /// Queues a change by hand. Repository writes queue their own.
    pub async fn enqueue(&mut self, entry: NewSyncQueueEntry) -> DbResult<SyncQueueEntry> {
        let mut conn = self.writer().await?;
        let entry = ops::enqueue(&mut conn, entry).await?;
        conn.commit().await?;
        debug!(id = %entry.id, model = %entry.model, action = %entry.action, "Change queued");
        Ok(entry)
    }

    /// Pending entries, oldest first.
    pub async fn pending(&mut self, limit: i64) -> DbResult<Vec<SyncQueueEntry>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(Field::Status, SyncStatus::Pending))
                .order_by(OrderBy::asc(Field::CreatedAt))
                .take(limit),
        )
        .await
    }

    /// Moves up to `limit` of the oldest pending entries to `processing` and
    /// returns them, oldest first.
    pub async fn claim_pending(&mut self, limit: i64) -> DbResult<Vec<SyncQueueEntry>> {
        let mut conn = self.writer().await?;

        let pending = ops::find_many::<SyncQueueEntry>(
            &mut conn,
            &FindMany::new()
                .filter(Filter::eq(Field::Status, SyncStatus::Pending))
                .order_by(OrderBy::asc(Field::CreatedAt))
                .order_by(OrderBy::asc(Field::Id))
                .take(limit),
        )
        .await?;
        if pending.is_empty() {
            return Ok(pending);
        }

        let ids: Vec<&str> = pending.iter().map(|e| e.id.as_str()).collect();
        let mut claimed = ops::update_many::<SyncQueueEntry>(
            &mut conn,
            Some(&Filter::is_in(Field::Id, ids).and(Filter::eq(Field::Status, SyncStatus::Pending))),
            &[Assignment::set(Field::Status, SyncStatus::Processing)],
            false,
        )
        .await?;

        conn.commit().await?;

        claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        debug!(count = claimed.len(), "Claimed sync entries");
        Ok(claimed)
    }

    pub async fn mark_completed(&mut self, id: &str) -> DbResult<SyncQueueEntry> {
        self.update_fields(
            id,
            &[
                Assignment::set(Field::Status, SyncStatus::Completed),
                Assignment::set(Field::Error, None::<String>),
            ],
        )
        .await
    }

    /// Hands claimed entries back to `pending` without touching their
    /// retry count. Used when a push never reached the remote.
    pub async fn release(&mut self, ids: &[String]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let released = self
            .update_many(
                Some(
                    Filter::is_in(Field::Id, ids.iter().map(String::as_str).collect::<Vec<_>>())
                        .and(Filter::eq(Field::Status, SyncStatus::Processing)),
                ),
                &[Assignment::set(Field::Status, SyncStatus::Pending)],
            )
            .await?;
        debug!(count = released, "Released sync entries");
        Ok(released)
    }

    /// Records a failed push. The entry goes back to `pending` until its
    /// retry count reaches `max_retries`, then stays `failed`.
    pub async fn mark_failed(
        &mut self,
        id: &str,
        error: &str,
        max_retries: i64,
    ) -> DbResult<SyncQueueEntry> {
        let mut conn = self.writer().await?;

        let current = ops::find_unique::<SyncQueueEntry>(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("SyncQueue", id))?;

        let retry_count = current.retry_count + 1;
        let status = if retry_count >= max_retries {
            SyncStatus::Failed
        } else {
            SyncStatus::Pending
        };

        let updated = ops::update_fields::<SyncQueueEntry>(
            &mut conn,
            id,
            &[
                Assignment::set(Field::Status, status),
                Assignment::set(Field::RetryCount, retry_count),
                Assignment::set(Field::Error, error),
            ],
            false,
        )
        .await?;

        conn.commit().await?;

        if status == SyncStatus::Failed {
            warn!(id, model = %updated.model, retry_count, error, "Sync entry gave up");
        } else {
            debug!(id, retry_count, error, "Sync entry will be retried");
        }
        Ok(updated)
    }

    /// Returns entries left in `processing` (by a crashed run) to `pending`.
    pub async fn reset_processing(&mut self) -> DbResult<u64> {
        let reset = self
            .update_many(
                Some(Filter::eq(Field::Status, SyncStatus::Processing)),
                &[Assignment::set(Field::Status, SyncStatus::Pending)],
            )
            .await?;
        if reset > 0 {
            info!(count = reset, "Reset stale processing entries");
        }
        Ok(reset)
    }

    /// Gives every failed entry a fresh set of retries.
    pub async fn retry_failed(&mut self) -> DbResult<u64> {
        let retried = self
            .update_many(
                Some(Filter::eq(Field::Status, SyncStatus::Failed)),
                &[
                    Assignment::set(Field::Status, SyncStatus::Pending),
                    Assignment::set(Field::RetryCount, 0),
                ],
            )
            .await?;
        info!(count = retried, "Failed entries re-queued");
        Ok(retried)
    }

    pub async fn counts_by_status(&mut self) -> DbResult<SyncQueueStats> {
        let groups = self.group_by(GroupBy::new([Field::Status]).count()).await?;

        let mut stats = SyncQueueStats::default();
        for group in groups {
            let count = group.count().unwrap_or(0);
            match group.key(Field::Status).as_str().map(SyncStatus::parse) {
                Some(Ok(SyncStatus::Pending)) => stats.pending = count,
                Some(Ok(SyncStatus::Processing)) => stats.processing = count,
                Some(Ok(SyncStatus::Completed)) => stats.completed = count,
                Some(Ok(SyncStatus::Failed)) => stats.failed = count,
                _ => {
                    return Err(DbError::Internal(format!(
                        "unknown sync status {}",
                        group.key(Field::Status)
                    )))
                }
            }
        }
        Ok(stats)
    }

    /// Deletes completed entries last touched more than `older_than_days`
    /// days ago.
    pub async fn purge_completed(&mut self, older_than_days: i64) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let purged = self
            .delete_many(Some(
                Filter::eq(Field::Status, SyncStatus::Completed)
                    .and(Filter::lt(Field::UpdatedAt, cutoff)),
            ))
            .await?;
        info!(count = purged, %cutoff, "Purged completed sync entries");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{NewCategory, NewSyncQueueEntry, SyncAction, SyncStatus};

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_schema_rejects_unknown_status_and_action() {
        let db = fixtures::db().await;
        let insert = |action: &'static str, status: &'static str| {
            sqlx::query(
                r#"INSERT INTO "SyncQueue" ("id", "action", "model", "data", "status")
                   VALUES (?, ?, 'Customer', '{}', ?)"#,
            )
            .bind(dukan_core::new_id())
            .bind(action)
            .bind(status)
        };

        assert!(insert("create", "queued").execute(db.pool()).await.is_err());
        assert!(insert("upsert", "pending").execute(db.pool()).await.is_err());
        insert("create", "pending").execute(db.pool()).await.unwrap();

        assert_eq!(db.sync_queue().pending(10).await.unwrap().len(), 1);
        assert_eq!(db.sync_queue().counts_by_status().await.unwrap().pending, 1);
    }

    #[tokio::test]
    async fn test_writes_are_captured() {
        let db = fixtures::db().await;
        let category = db.categories().create(NewCategory::new("Sarees")).await.unwrap();
        db.categories().rename(&category.id, "Silk Sarees").await.unwrap();
        db.categories().delete(&category.id).await.unwrap();

        let entries = db.sync_queue().pending(10).await.unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(actions, [SyncAction::Create, SyncAction::Update, SyncAction::Delete]);
        assert!(entries.iter().all(|e| e.model == "Category"));

        let updated = entries[1].payload().unwrap();
        assert_eq!(updated["name"], "Silk Sarees");
        assert_eq!(entries[2].payload().unwrap()["id"], category.id.as_str());
    }

    #[tokio::test]
    async fn test_capture_can_be_disabled() {
        let db = fixtures::db_without_capture().await;
        db.categories().create(NewCategory::new("Sarees")).await.unwrap();
        assert_eq!(db.sync_queue().count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claim_complete_and_fail() {
        let db = fixtures::db_without_capture().await;
        for n in 0..3 {
            db.sync_queue()
                .enqueue(NewSyncQueueEntry::deleted("Customer", &format!("c-{n}")))
                .await
                .unwrap();
        }

        let claimed = db.sync_queue().claim_pending(2).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|e| e.status == SyncStatus::Processing));

        db.sync_queue().mark_completed(&claimed[0].id).await.unwrap();
        let retried = db.sync_queue().mark_failed(&claimed[1].id, "HTTP 502", 2).await.unwrap();
        assert_eq!(retried.status, SyncStatus::Pending);
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.error.as_deref(), Some("HTTP 502"));

        let stats = db.sync_queue().counts_by_status().await.unwrap();
        assert_eq!((stats.pending, stats.completed, stats.total()), (2, 1, 3));

        let gave_up = db.sync_queue().mark_failed(&claimed[1].id, "HTTP 502", 2).await.unwrap();
        assert_eq!(gave_up.status, SyncStatus::Failed);

        assert_eq!(db.sync_queue().retry_failed().await.unwrap(), 1);
        let again = db.sync_queue().get(&claimed[1].id).await.unwrap();
        assert_eq!((again.status, again.retry_count), (SyncStatus::Pending, 0));
    }

    #[tokio::test]
    async fn test_reset_and_purge() {
        let db = fixtures::db_without_capture().await;
        let entry = db
            .sync_queue()
            .enqueue(NewSyncQueueEntry::deleted("Customer", "c-1"))
            .await
            .unwrap();
        let claimed = db.sync_queue().claim_pending(10).await.unwrap();
        assert!(db.sync_queue().claim_pending(10).await.unwrap().is_empty());

        let ids: Vec<String> = claimed.into_iter().map(|e| e.id).collect();
        assert_eq!(db.sync_queue().release(&ids).await.unwrap(), 1);
        let released = db.sync_queue().get(&entry.id).await.unwrap();
        assert_eq!((released.status, released.retry_count), (SyncStatus::Pending, 0));

        db.sync_queue().claim_pending(10).await.unwrap();
        assert_eq!(db.sync_queue().reset_processing().await.unwrap(), 1);
        db.sync_queue().mark_completed(&entry.id).await.unwrap();

        assert_eq!(db.sync_queue().purge_completed(7).await.unwrap(), 0);
        assert_eq!(db.sync_queue().purge_completed(0).await.unwrap(), 1);
    }
}

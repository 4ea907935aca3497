//! # Outbox Processor
//!
//! Drains the `SyncQueue` table to a [`SyncTarget`].
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Processor Flow                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    SyncQueue Table                              │   │
//! │  │                                                                 │   │
//! │  │  id | action | model   | data  | status     | retryCount       │   │
//! │  │  ───┼────────┼─────────┼───────┼────────────┼──────────────────│   │
//! │  │  a  │ create │ Sale    │ {...} │ pending    │ 0                │   │
//! │  │  b  │ update │ Product │ {...} │ pending    │ 1                │   │
//! │  │  c  │ delete │ Setting │ {id}  │ failed     │ 5                │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    OutboxProcessor                              │   │
//! │  │                                                                 │   │
//! │  │  0. Start: processing → pending (left over by a crash)         │   │
//! │  │                                                                 │   │
//! │  │  1. Claim: oldest `batch_size` pending → processing            │   │
//! │  │                                                                 │   │
//! │  │  2. Push:  SyncTarget::push(SyncBatch)                         │   │
//! │  │                                                                 │   │
//! │  │  3. Mark:  accepted        → completed                         │   │
//! │  │            rejected        → mark_failed (retry accounting)    │   │
//! │  │            no verdict      → mark_failed                       │   │
//! │  │                                                                 │   │
//! │  │  4. On push error: release batch (no retry charged),           │   │
//! │  │                    exponential backoff before the next poll    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Poll interval: 5 seconds (configurable)                             │
//! │  • Full batch: next poll immediately                                   │
//! │  • Backoff: 500ms doubling up to 60s (configurable)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use dukan_db::Database;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::target::{SyncBatch, SyncBatchResponse, SyncTarget};

/// Error recorded for an entry the remote said nothing about.
const MISSING_VERDICT: &str = "No result returned for entry";

// =============================================================================
// Batch Report
// =============================================================================

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Entries moved to `processing` for this pass.
    pub claimed: usize,
    pub completed: usize,
    /// Entries charged a retry (rejected or missing from the response).
    pub failed: usize,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }
}

// =============================================================================
// Outbox Processor
// =============================================================================

/// Pushes pending queue entries to a [`SyncTarget`].
pub struct OutboxProcessor<T: SyncTarget> {
    db: Database,
    config: Arc<SyncConfig>,
    target: T,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling a running processor.
#[derive(Clone)]
pub struct OutboxProcessorHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl OutboxProcessorHandle {
    /// Triggers graceful shutdown. The current pass finishes first.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Shutdown channel closed".into()))
    }
}

impl<T: SyncTarget> OutboxProcessor<T> {
    /// Creates a processor and the handle that stops it.
    pub fn new(db: Database, config: Arc<SyncConfig>, target: T) -> (Self, OutboxProcessorHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let processor = OutboxProcessor {
            db,
            config,
            target,
            shutdown_rx,
        };

        (processor, OutboxProcessorHandle { shutdown_tx })
    }

    /// Runs until [`OutboxProcessorHandle::shutdown`] is called or every
    /// handle is dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            target = %self.target.describe(),
            batch_size = self.config.sync.batch_size,
            "Outbox processor starting"
        );

        if let Err(e) = self.db.sync_queue().reset_processing().await {
            error!(?e, "Failed to reset processing entries");
        }

        let poll_interval = self.config.sync.poll_interval();
        let mut backoff = self.create_backoff();
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}

                _ = self.shutdown_rx.recv() => {
                    info!("Outbox processor shutting down");
                    break;
                }
            }

            delay = match self.run_once().await {
                Ok(report) => {
                    backoff.reset();
                    if report.claimed >= self.config.sync.batch_size {
                        // More is waiting
                        Duration::ZERO
                    } else {
                        poll_interval
                    }
                }
                Err(e) => {
                    let wait = backoff.next_backoff().unwrap_or(poll_interval);
                    if e.is_retryable() {
                        warn!(error = %e, ?wait, "Sync push failed, backing off");
                    } else {
                        error!(error = %e, ?wait, "Sync push failed");
                    }
                    wait
                }
            };
        }

        info!("Outbox processor stopped");
    }

    /// Claims one batch, pushes it and records the outcome.
    ///
    /// When the push fails, or recording a verdict fails, every entry still
    /// `processing` is released back to `pending` and the error is returned.
    pub async fn run_once(&mut self) -> SyncResult<BatchReport> {
        let limit = i64::try_from(self.config.sync.batch_size).unwrap_or(i64::MAX);
        let entries = self.db.sync_queue().claim_pending(limit).await?;

        if entries.is_empty() {
            debug!("No pending sync entries");
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport {
            claimed: entries.len(),
            ..Default::default()
        };
        info!(count = report.claimed, "Processing sync batch");

        let batch = SyncBatch::new(&self.config, entries);
        let ids = batch.ids();

        let response = match self.target.push(&batch).await {
            Ok(response) => response,
            Err(e) => {
                self.db.sync_queue().release(&ids).await?;
                return Err(e);
            }
        };

        if let Err(e) = self.apply_verdicts(&ids, &response, &mut report).await {
            // Entries already marked are no longer `processing`; the rest go back.
            if let Err(release) = self.db.sync_queue().release(&ids).await {
                error!(error = %release, "Failed to release sync batch");
            }
            return Err(e);
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            "Sync batch processed"
        );
        Ok(report)
    }

    async fn apply_verdicts(
        &self,
        ids: &[String],
        response: &SyncBatchResponse,
        report: &mut BatchReport,
    ) -> SyncResult<()> {
        let max_retries = i64::from(self.config.sync.max_retries);
        let mut pending: HashSet<&str> = ids.iter().map(String::as_str).collect();

        for id in &response.accepted {
            if !pending.remove(id.as_str()) {
                warn!(id = %id, "Accepted id was not in the batch");
                continue;
            }
            self.db.sync_queue().mark_completed(id).await?;
            report.completed += 1;
        }

        for rejected in &response.rejected {
            if !pending.remove(rejected.id.as_str()) {
                warn!(id = %rejected.id, "Rejected id was not in the batch");
                continue;
            }
            self.db
                .sync_queue()
                .mark_failed(&rejected.id, &rejected.error, max_retries)
                .await?;
            report.failed += 1;
        }

        for id in pending {
            warn!(id, "Sync endpoint returned no verdict for entry");
            self.db
                .sync_queue()
                .mark_failed(id, MISSING_VERDICT, max_retries)
                .await?;
            report.failed += 1;
        }
        Ok(())
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.sync.initial_backoff(),
            max_interval: self.config.sync.max_backoff(),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{RejectedEntry, SyncBatchResponse};
    use async_trait::async_trait;
    use dukan_core::{NewSyncQueueEntry, SyncStatus};
    use dukan_db::DbConfig;
    use std::sync::Mutex;

    /// How the fake remote answers.
    #[derive(Clone, Copy)]
    enum Verdict {
        AcceptAll,
        RejectFirst,
        AcceptNone,
        Unreachable,
        /// Removes the second entry from the queue mid-push, then accepts all.
        DropSecond,
    }

    #[derive(Clone)]
    struct FakeTarget {
        verdict: Verdict,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
        db: Option<Database>,
    }

    impl FakeTarget {
        fn new(verdict: Verdict) -> Self {
            FakeTarget {
                verdict,
                batches: Arc::new(Mutex::new(Vec::new())),
                db: None,
            }
        }

        fn with_db(mut self, db: &Database) -> Self {
            self.db = Some(db.clone());
            self
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SyncTarget for FakeTarget {
        async fn push(&self, batch: &SyncBatch) -> SyncResult<SyncBatchResponse> {
            let ids = batch.ids();
            self.batches.lock().unwrap().push(ids.clone());

            match self.verdict {
                Verdict::AcceptAll => Ok(SyncBatchResponse {
                    accepted: ids,
                    rejected: Vec::new(),
                }),
                Verdict::RejectFirst => Ok(SyncBatchResponse {
                    accepted: ids[1..].to_vec(),
                    rejected: vec![RejectedEntry {
                        id: ids[0].clone(),
                        error: "stale row".to_string(),
                    }],
                }),
                Verdict::AcceptNone => Ok(SyncBatchResponse::default()),
                Verdict::Unreachable => Err(SyncError::ConnectionFailed("connection refused".into())),
                Verdict::DropSecond => {
                    if let Some(db) = &self.db {
                        db.sync_queue().delete(&ids[1]).await?;
                    }
                    Ok(SyncBatchResponse {
                        accepted: ids,
                        rejected: Vec::new(),
                    })
                }
            }
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    async fn setup(entries: usize) -> (Database, Vec<String>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut ids = Vec::new();
        for n in 0..entries {
            let entry = db
                .sync_queue()
                .enqueue(NewSyncQueueEntry::deleted("Customer", &format!("c-{n}")))
                .await
                .unwrap();
            ids.push(entry.id);
        }
        (db, ids)
    }

    fn config(batch_size: usize, max_retries: u32) -> Arc<SyncConfig> {
        let mut config = SyncConfig::default();
        config.sync.batch_size = batch_size;
        config.sync.max_retries = max_retries;
        config.sync.poll_interval_secs = 1;
        config.sync.initial_backoff_ms = 10;
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_accepted_entries_complete() {
        let (db, ids) = setup(3).await;
        let target = FakeTarget::new(Verdict::AcceptAll);
        let (mut processor, _handle) = OutboxProcessor::new(db.clone(), config(2, 3), target.clone());

        let first = processor.run_once().await.unwrap();
        assert_eq!((first.claimed, first.completed, first.failed), (2, 2, 0));
        let second = processor.run_once().await.unwrap();
        assert_eq!(second.claimed, 1);
        assert!(processor.run_once().await.unwrap().is_empty());

        // Oldest first
        assert_eq!(target.batches(), vec![ids[..2].to_vec(), ids[2..].to_vec()]);

        let stats = db.sync_queue().counts_by_status().await.unwrap();
        assert_eq!(stats.completed, 3);
    }

    #[tokio::test]
    async fn test_rejected_entries_are_retried_then_parked() {
        let (db, ids) = setup(2).await;
        let (mut processor, _handle) =
            OutboxProcessor::new(db.clone(), config(10, 2), FakeTarget::new(Verdict::RejectFirst));

        let report = processor.run_once().await.unwrap();
        assert_eq!((report.completed, report.failed), (1, 1));

        let rejected = db.sync_queue().get(&ids[0]).await.unwrap();
        assert_eq!(rejected.status, SyncStatus::Pending);
        assert_eq!(rejected.retry_count, 1);
        assert_eq!(rejected.error.as_deref(), Some("stale row"));

        processor.run_once().await.unwrap();
        let parked = db.sync_queue().get(&ids[0]).await.unwrap();
        assert_eq!(parked.status, SyncStatus::Failed);
        assert!(processor.run_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_verdict_counts_as_failure() {
        let (db, ids) = setup(1).await;
        let (mut processor, _handle) =
            OutboxProcessor::new(db.clone(), config(10, 5), FakeTarget::new(Verdict::AcceptNone));

        let report = processor.run_once().await.unwrap();
        assert_eq!(report.failed, 1);
        let entry = db.sync_queue().get(&ids[0]).await.unwrap();
        assert_eq!(entry.retry_count, 1);
        assert_eq!(entry.error.as_deref(), Some(MISSING_VERDICT));
    }

    #[tokio::test]
    async fn test_failed_verdict_write_releases_rest_of_batch() {
        let (db, ids) = setup(3).await;
        let target = FakeTarget::new(Verdict::DropSecond).with_db(&db);
        let (mut processor, _handle) = OutboxProcessor::new(db.clone(), config(10, 3), target);

        let err = processor.run_once().await.unwrap_err();
        assert!(matches!(err, SyncError::DatabaseError(_)));

        let first = db.sync_queue().get(&ids[0]).await.unwrap();
        assert_eq!(first.status, SyncStatus::Completed);
        let third = db.sync_queue().get(&ids[2]).await.unwrap();
        assert_eq!((third.status, third.retry_count), (SyncStatus::Pending, 0));
        assert_eq!(db.sync_queue().counts_by_status().await.unwrap().processing, 0);

        let retry = processor.run_once().await.unwrap();
        assert_eq!((retry.claimed, retry.completed), (1, 1));
    }

    #[tokio::test]
    async fn test_transport_failure_releases_batch() {
        let (db, ids) = setup(2).await;
        let (mut processor, _handle) =
            OutboxProcessor::new(db.clone(), config(10, 1), FakeTarget::new(Verdict::Unreachable));

        let err = processor.run_once().await.unwrap_err();
        assert!(err.is_retryable());

        for id in &ids {
            let entry = db.sync_queue().get(id).await.unwrap();
            assert_eq!((entry.status, entry.retry_count), (SyncStatus::Pending, 0));
        }
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (db, _ids) = setup(3).await;
        let target = FakeTarget::new(Verdict::AcceptAll);
        let (processor, handle) = OutboxProcessor::new(db.clone(), config(10, 3), target.clone());

        let task = tokio::spawn(processor.run());

        for _ in 0..200 {
            if !target.batches().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(target.batches().len(), 1);
        assert_eq!(db.sync_queue().counts_by_status().await.unwrap().completed, 3);
    }
}

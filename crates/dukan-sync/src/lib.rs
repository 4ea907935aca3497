//! # dukan-sync: Sync Queue Processor for Dukan POS
//!
//! Pushes the changes captured in the `SyncQueue` table to a remote
//! endpoint, so the store keeps selling offline and catches up later.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Processor Architecture                      │
//! │                                                                         │
//! │  dukan-db repository write                                             │
//! │       │  (same transaction)                                            │
//! │       ▼                                                                 │
//! │  ┌────────────────┐                                                    │
//! │  │   SyncQueue    │  pending → processing → completed | failed         │
//! │  └───────┬────────┘                                                    │
//! │          │ claim_pending(batch_size)                                    │
//! │          ▼                                                              │
//! │  ┌────────────────┐        ┌────────────────┐        ┌──────────────┐  │
//! │  │ OutboxProcessor│──────► │  SyncTarget    │──────► │ remote       │  │
//! │  │                │ batch  │ HttpSyncTarget │  POST  │ /sync/batch  │  │
//! │  │ Spawned as a   │◄────── │                │◄────── │              │  │
//! │  │ Tokio task     │verdict │                │  JSON  │              │  │
//! │  └────────────────┘        └────────────────┘        └──────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Sync configuration (device, store, endpoint, batching)
//! - [`error`] - Sync error types
//! - [`outbox`] - The queue processor
//! - [`target`] - Batch wire types and the HTTP target
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dukan_sync::{HttpSyncTarget, OutboxProcessor, SyncConfig};
//!
//! let config = Arc::new(SyncConfig::load(None)?);
//! let target = HttpSyncTarget::new(&config)?;
//!
//! let (processor, handle) = OutboxProcessor::new(db.clone(), config, target);
//! tokio::spawn(processor.run());
//!
//! // later
//! handle.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod outbox;
pub mod target;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DeviceConfig, StoreConfig, SyncConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use outbox::{BatchReport, OutboxProcessor, OutboxProcessorHandle};
pub use target::{HttpSyncTarget, RejectedEntry, SyncBatch, SyncBatchResponse, SyncTarget};

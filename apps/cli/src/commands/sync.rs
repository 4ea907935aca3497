//! `sync status|once|run|retry-failed|purge`.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use tracing::info;

use dukan_db::SyncQueueStats;
use dukan_sync::{HttpSyncTarget, OutboxProcessor};

use super::Context;
use crate::output::print_json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncStatusView {
    device_id: String,
    store_id: String,
    enabled: bool,
    endpoint: Option<String>,
    queue: SyncQueueStats,
}

pub async fn status(ctx: &Context) -> Result<()> {
    let config = ctx.sync_config()?;
    let queue = ctx.db.sync_queue().counts_by_status().await?;

    let view = SyncStatusView {
        device_id: config.device_id().to_string(),
        store_id: config.store_id().to_string(),
        enabled: config.is_sync_enabled(),
        endpoint: config.endpoint().map(str::to_string),
        queue,
    };

    if ctx.json {
        return print_json(&view);
    }
    println!("Device   {} (store {})", view.device_id, view.store_id);
    println!(
        "Sync     {} → {}",
        if view.enabled { "enabled" } else { "disabled" },
        view.endpoint.as_deref().unwrap_or("no endpoint")
    );
    println!(
        "Queue    {} pending • {} processing • {} completed • {} failed",
        queue.pending, queue.processing, queue.completed, queue.failed
    );
    Ok(())
}

pub async fn once(ctx: &Context) -> Result<()> {
    let config = Arc::new(ctx.sync_config()?);
    let target = HttpSyncTarget::new(&config)?;
    let (mut processor, _handle) = OutboxProcessor::new(ctx.db.clone(), config, target);

    let report = processor.run_once().await.context("sync push failed")?;

    if ctx.json {
        return print_json(&report);
    }
    if report.is_empty() {
        println!("Nothing to sync");
    } else {
        println!(
            "Pushed {} entries: {} completed, {} failed",
            report.claimed, report.completed, report.failed
        );
    }
    Ok(())
}

pub async fn run(ctx: &Context) -> Result<()> {
    let config = ctx.sync_config()?;
    if !config.is_sync_enabled() {
        bail!("sync is disabled; set [sync] enabled = true or DUKAN_SYNC_ENABLED=1");
    }
    let config = Arc::new(config);
    let target = HttpSyncTarget::new(&config)?;
    let (processor, handle) = OutboxProcessor::new(ctx.db.clone(), config, target);

    let task = tokio::spawn(processor.run());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Interrupt received, stopping sync");

    handle.shutdown().await?;
    task.await.context("sync processor panicked")?;
    Ok(())
}

pub async fn retry_failed(ctx: &Context) -> Result<()> {
    let count = ctx.db.sync_queue().retry_failed().await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "requeued": count }));
    }
    println!("Re-queued {} failed entries", count);
    Ok(())
}

pub async fn purge(ctx: &Context, days: Option<i64>) -> Result<()> {
    let days = match days {
        Some(days) => days,
        None => ctx.sync_config()?.sync.retention_days,
    };
    if days < 0 {
        bail!("--days must not be negative");
    }

    let count = ctx.db.sync_queue().purge_completed(days).await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "purged": count, "olderThanDays": days }));
    }
    println!("Purged {} completed entries older than {} days", count, days);
    Ok(())
}

//! # Database Migrations
//!
//! Embedded SQL migrations for Dukan POS.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Database::new / `dukan migrate`                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Check _sqlx_migrations table (created if missing)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Compare embedded migrations vs applied                                │
//! │       │                                                                 │
//! │       └── 001_initial_schema.sql   12 tables, keys, indexes            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Run pending migrations in order, record each in _sqlx_migrations      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from this crate's `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent: applied migrations are skipped by checksum.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Embedded vs applied migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.applied)
    }
}

/// Returns information about migrations.
///
/// A database that never ran migrations reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let total = MIGRATOR.migrations.len();

    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table > 0 {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    Ok(MigrationStatus {
        total,
        applied: applied as usize,
    })
}

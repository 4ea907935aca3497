//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  CLI / sync processor startup                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.sales() / db.variants() / ...  ← one pooled connection per call    │
//! │  db.transaction(..)                ← one connection for the closure    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL (Write-Ahead Logging) mode:
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use futures_util::future::BoxFuture;

use dukan_core::{
    AuditLog, Category, Customer, InventoryMovement, PrinterConfig, Product, ProductVariant,
    Sale, SaleItem, Setting, SyncQueueEntry, User,
};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::Repository;
use crate::schema::Table;
use crate::transaction::{self, TransactionOptions, TxContext};

// =============================================================================
// Configuration
// =============================================================================

const MEMORY_PATH: &str = ":memory:";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/dukan.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Whether repository writes append a row to `SyncQueue`.
    /// Default: true
    pub capture_changes: bool,
}

impl DbConfig {
    /// Creates a configuration for the database file at `path`. The file is
    /// created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            capture_changes: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets whether repository writes are queued for sync.
    pub fn capture_changes(mut self, capture: bool) -> Self {
        self.capture_changes = capture;
        self
    }

    /// An isolated in-memory database (for tests).
    ///
    /// The whole database lives on one connection, so the pool holds exactly
    /// one and never recycles it.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            capture_changes: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; clones share the pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./dukan.db")).await?;
/// let variant = db.variants().lookup("8901234567890").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    capture: bool,
}

impl Database {
    /// Creates the connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads (file databases)
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            capture_changes = config.capture_changes,
            "Initializing database connection"
        );

        let pool = if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .acquire_timeout(config.connect_timeout)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                // Readers don't block writers, writers don't block readers
                .journal_mode(SqliteJournalMode::Wal)
                // May lose the last transaction on power loss, never corrupts
                .synchronous(SqliteSynchronous::Normal)
                // SQLite has them disabled by default
                .foreign_keys(true)
                // Queued writers wait this long for the write lock
                .busy_timeout(config.connect_timeout)
                .create_if_missing(true);

            debug!("Connection options configured");

            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.connect_timeout)
                .idle_timeout(Some(config.idle_timeout))
                .connect_with(options)
                .await
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        };

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            capture: config.capture_changes,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether repository writes are queued for sync.
    pub fn captures_changes(&self) -> bool {
        self.capture
    }

    /// Runs `f` inside one transaction. Commits when it returns `Ok`, rolls
    /// back on `Err` or when `options.timeout` elapses.
    ///
    /// See [`transaction`](crate::transaction) for an example.
    pub async fn transaction<R, F>(&self, options: TransactionOptions, f: F) -> DbResult<R>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut TxContext) -> BoxFuture<'t, DbResult<R>> + Send,
    {
        transaction::run(&self.pool, self.capture, options, f).await
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    fn repo<T: Table>(&self) -> Repository<'static, T> {
        Repository::new(self.pool.clone(), self.capture)
    }

    pub fn users(&self) -> Repository<'static, User> {
        self.repo()
    }

    pub fn categories(&self) -> Repository<'static, Category> {
        self.repo()
    }

    pub fn products(&self) -> Repository<'static, Product> {
        self.repo()
    }

    pub fn variants(&self) -> Repository<'static, ProductVariant> {
        self.repo()
    }

    pub fn customers(&self) -> Repository<'static, Customer> {
        self.repo()
    }

    pub fn sales(&self) -> Repository<'static, Sale> {
        self.repo()
    }

    pub fn sale_items(&self) -> Repository<'static, SaleItem> {
        self.repo()
    }

    pub fn audit_logs(&self) -> Repository<'static, AuditLog> {
        self.repo()
    }

    pub fn inventory(&self) -> Repository<'static, InventoryMovement> {
        self.repo()
    }

    pub fn settings(&self) -> Repository<'static, Setting> {
        self.repo()
    }

    pub fn printers(&self) -> Repository<'static, PrinterConfig> {
        self.repo()
    }

    pub fn sync_queue(&self) -> Repository<'static, SyncQueueEntry> {
        self.repo()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Closes the pool. Every later repository call fails.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Whether the database answers `SELECT 1`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert!(db.captures_changes());
        let status = db.migration_status().await.unwrap();
        assert_eq!(status.pending(), 0);
        assert!(status.applied >= 1);
    }

    #[tokio::test]
    async fn test_without_migrations() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let status = db.migration_status().await.unwrap();
        assert_eq!(status.applied, 0);
        assert!(status.pending() >= 1);

        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        assert_eq!(db.migration_status().await.unwrap().pending(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .capture_changes(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.capture_changes);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}

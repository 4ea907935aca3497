//! # Interactive Transactions
//!
//! Runs a closure against repositories that share one SQLite transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.transaction(options, |tx| Box::pin(async move { ... }))             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE        ── bounded by max_wait ──► TransactionTimeout   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  closure(&mut TxContext) ── bounded by timeout ──► TransactionTimeout   │
//! │       │                                                                 │
//! │       ├── Ok(value) ──► COMMIT ──► Ok(value)                            │
//! │       └── Err(e)    ──► ROLLBACK ─► Err(e)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let sale = db
//!     .transaction(TransactionOptions::default(), |tx| {
//!         Box::pin(async move {
//!             let sale = tx.sales().create_with_items(input).await?;
//!             tx.audit_logs().log("sale.create", sale.sale.id.clone(), Some(user_id.as_str())).await?;
//!             Ok::<_, DbError>(sale)
//!         })
//!     })
//!     .await?;
//! ```
//!
//! Everything inside the closure must go through `tx`. Reaching for the pool
//! (`db.users()`) from inside waits for a second connection, which an
//! in-memory database never has.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::time::timeout;
use tracing::{debug, warn};

use dukan_core::{
    AuditLog, Category, Customer, InventoryMovement, PrinterConfig, Product, ProductVariant,
    Sale, SaleItem, Setting, SyncQueueEntry, User,
};

use crate::error::{DbError, DbResult};
use crate::repository::{Repository, BEGIN_IMMEDIATE};

// =============================================================================
// Options
// =============================================================================

/// SQLite runs every transaction serializably; there is nothing else to pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[default]
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// How long to wait for a connection to begin on.
    /// Default: 2 seconds
    pub max_wait: Duration,

    /// How long the closure may run before the transaction is rolled back.
    /// Default: 5 seconds
    pub timeout: Duration,

    pub isolation_level: IsolationLevel,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        TransactionOptions {
            max_wait: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            isolation_level: IsolationLevel::Serializable,
        }
    }
}

impl TransactionOptions {
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Context
// =============================================================================

/// Repository access inside a transaction. Every repository borrowed from
/// here runs on the same connection.
pub struct TxContext {
    tx: Transaction<'static, Sqlite>,
    capture: bool,
}

impl TxContext {
    fn repo<T: crate::schema::Table>(&mut self) -> Repository<'_, T> {
        Repository::in_tx(&mut *self.tx, self.capture)
    }

    pub fn users(&mut self) -> Repository<'_, User> {
        self.repo()
    }

    pub fn categories(&mut self) -> Repository<'_, Category> {
        self.repo()
    }

    pub fn products(&mut self) -> Repository<'_, Product> {
        self.repo()
    }

    pub fn variants(&mut self) -> Repository<'_, ProductVariant> {
        self.repo()
    }

    pub fn customers(&mut self) -> Repository<'_, Customer> {
        self.repo()
    }

    pub fn sales(&mut self) -> Repository<'_, Sale> {
        self.repo()
    }

    pub fn sale_items(&mut self) -> Repository<'_, SaleItem> {
        self.repo()
    }

    pub fn audit_logs(&mut self) -> Repository<'_, AuditLog> {
        self.repo()
    }

    pub fn inventory(&mut self) -> Repository<'_, InventoryMovement> {
        self.repo()
    }

    pub fn settings(&mut self) -> Repository<'_, Setting> {
        self.repo()
    }

    pub fn printers(&mut self) -> Repository<'_, PrinterConfig> {
        self.repo()
    }

    pub fn sync_queue(&mut self) -> Repository<'_, SyncQueueEntry> {
        self.repo()
    }

    /// The raw connection, for queries the repositories don't cover.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

// =============================================================================
// Runner
// =============================================================================

pub(crate) async fn run<R, F>(
    pool: &SqlitePool,
    capture: bool,
    options: TransactionOptions,
    f: F,
) -> DbResult<R>
where
    R: Send,
    F: for<'t> FnOnce(&'t mut TxContext) -> BoxFuture<'t, DbResult<R>> + Send,
{
    let tx = timeout(options.max_wait, pool.begin_with(BEGIN_IMMEDIATE))
        .await
        .map_err(|_| DbError::TransactionTimeout(options.max_wait))??;
    debug!(isolation = ?options.isolation_level, "Transaction started");

    let mut ctx = TxContext { tx, capture };

    let result = match timeout(options.timeout, f(&mut ctx)).await {
        Ok(result) => result,
        Err(_) => Err(DbError::TransactionTimeout(options.timeout)),
    };

    match result {
        Ok(value) => {
            ctx.tx
                .commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = ctx.tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            debug!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dukan_core::{NewCategory, NewProduct, NewSale, NewSaleItem};

    use super::TransactionOptions;
    use crate::error::DbError;
    use crate::repository::fixtures;
    use crate::query::Filter;
    use crate::schema::CategoryField;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_then_write_transactions_queue() {
        let (_dir, db) = fixtures::file_db().await;

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.transaction(TransactionOptions::default(), |tx| {
                        Box::pin(async move {
                            let seen = tx.categories().count(None).await?;
                            let category = tx
                                .categories()
                                .create(NewCategory::new(format!("Rack {seen}")))
                                .await?;
                            Ok::<_, DbError>(category.name)
                        })
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        for rack in 0..6 {
            assert!(db
                .categories()
                .get_by_name(&format!("Rack {rack}"))
                .await
                .unwrap()
                .is_some());
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_commit_spans_repositories() {
        let db = fixtures::db().await;

        let product_id = db
            .transaction(TransactionOptions::default(), |tx| {
                Box::pin(async move {
                    let category = tx.categories().create(NewCategory::new("Sarees")).await?;
                    let product = tx
                        .products()
                        .create(NewProduct::new("Banarasi Silk", category.id))
                        .await?;
                    Ok::<_, DbError>(product.id)
                })
            })
            .await
            .unwrap();

        assert!(db.products().find_unique(&product_id).await.unwrap().is_some());
        assert_eq!(db.sync_queue().count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_error_rolls_back_everything() {
        let db = fixtures::db().await;

        let err = db
            .transaction(TransactionOptions::default(), |tx| {
                Box::pin(async move {
                    tx.categories().create(NewCategory::new("Sarees")).await?;
                    tx.categories().create(NewCategory::new("Sarees")).await?;
                    Ok::<_, DbError>(())
                })
            })
            .await
            .unwrap_err();

        assert!(err.is_unique_violation());
        assert_eq!(db.categories().count(None).await.unwrap(), 0);
        assert_eq!(db.sync_queue().count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nested_sale_inside_transaction() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;
        let product = fixtures::product(&db).await;
        let variant = fixtures::variant(&db, &product, "K-M", "1002").await;
        let input = NewSale::new(&user.id)
            .with_item(NewSaleItem::from_variant(&product, &variant, 1, 899.0));
        let variant_id = variant.id.clone();
        let user_id = user.id.clone();

        let bill_no = db
            .transaction(TransactionOptions::default(), |tx| {
                Box::pin(async move {
                    let sale = tx.sales().create_with_items(input).await?;
                    tx.variants().adjust_stock(&variant_id, -1).await?;
                    tx.audit_logs()
                        .log("sale.create", sale.sale.id.clone(), Some(user_id.as_str()))
                        .await?;
                    Ok::<_, DbError>(sale.sale.bill_no)
                })
            })
            .await
            .unwrap();

        assert_eq!(bill_no, 1);
        assert_eq!(db.variants().get(&variant.id).await.unwrap().stock, 9);
        assert_eq!(db.audit_logs().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let db = fixtures::db().await;
        let options = TransactionOptions::default().timeout(Duration::from_millis(50));

        let err = db
            .transaction(options, |tx| {
                Box::pin(async move {
                    tx.categories().create(NewCategory::new("Sarees")).await?;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok::<_, DbError>(())
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::TransactionTimeout(d) if d == Duration::from_millis(50)));
        assert!(!db
            .categories()
            .exists(Filter::eq(CategoryField::Name, "Sarees"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_max_wait_when_pool_is_busy() {
        let db = fixtures::db().await;
        let held = db.pool().acquire().await.unwrap();

        let options = TransactionOptions::default().max_wait(Duration::from_millis(50));
        let err = db
            .transaction(options, |_tx| Box::pin(async move { Ok::<_, DbError>(()) }))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TransactionTimeout(_)));

        drop(held);
        assert!(db.health_check().await);
    }
}

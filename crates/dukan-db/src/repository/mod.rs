//! # Repository Module
//!
//! Database repository implementations for Dukan POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Generic Repository                               │
//! │                                                                         │
//! │  db.variants().lookup("8901234567890")                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repository<'c, ProductVariant>                                        │
//! │  ├── generic: find_unique, get, find_first, find_many, count,          │
//! │  │            exists, create, create_many, update, update_fields,      │
//! │  │            update_many, delete, delete_many, aggregate, group_by    │
//! │  └── entity:  get_by_sku, get_by_barcode, lookup, adjust_stock, ...    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Source::Pool ─── reads: pooled connection                             │
//! │               └── writes: BEGIN IMMEDIATE … write + SyncQueue … COMMIT │
//! │  Source::Conn ─── everything on the caller's open transaction          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - accounts, password hashing, permission flags
//! - [`CategoryRepository`] / [`ProductRepository`] / [`ProductVariantRepository`] - catalog
//! - [`CustomerRepository`] - customer directory
//! - [`SaleRepository`] / [`SaleItemRepository`] - bills with nested items
//! - [`AuditLogRepository`] - audit trail
//! - [`InventoryRepository`] - stock movements
//! - [`SettingRepository`] / [`PrinterConfigRepository`] - configuration
//! - [`SyncQueueRepository`] - outbox state machine

pub mod audit;
pub mod category;
pub mod customer;
pub mod inventory;
pub mod printer;
pub mod product;
pub mod sale;
pub mod setting;
pub mod sync;
pub mod user;
pub mod variant;

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use dukan_core::{
    AuditLog, Category, Customer, InventoryMovement, PrinterConfig, Product, ProductVariant,
    Sale, SaleItem, Setting, SyncQueueEntry, User, ValidationError,
};

use crate::error::{DbError, DbResult};

/// Write transactions take the database write lock when they begin.
pub(crate) const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";
use crate::ops;
use crate::query::{Aggregate, AggregateResult, Assignment, Filter, FindMany, GroupBy, GroupRow};
use crate::schema::Table;

pub type UserRepository<'c> = Repository<'c, User>;
pub type CategoryRepository<'c> = Repository<'c, Category>;
pub type ProductRepository<'c> = Repository<'c, Product>;
pub type ProductVariantRepository<'c> = Repository<'c, ProductVariant>;
pub type CustomerRepository<'c> = Repository<'c, Customer>;
pub type SaleRepository<'c> = Repository<'c, Sale>;
pub type SaleItemRepository<'c> = Repository<'c, SaleItem>;
pub type AuditLogRepository<'c> = Repository<'c, AuditLog>;
pub type InventoryRepository<'c> = Repository<'c, InventoryMovement>;
pub type SettingRepository<'c> = Repository<'c, Setting>;
pub type PrinterConfigRepository<'c> = Repository<'c, PrinterConfig>;
pub type SyncQueueRepository<'c> = Repository<'c, SyncQueueEntry>;

// =============================================================================
// Inputs
// =============================================================================

/// A create input that becomes one row of `Row`.
pub trait Insertable: Send {
    type Row: Table;

    fn validate(&self) -> Result<(), ValidationError>;

    /// Builds the full row: fresh id, timestamps, derived columns.
    fn into_row(self) -> DbResult<Self::Row>;
}

/// A patch input that becomes column assignments on `Row`.
pub trait Patch: Send {
    type Row: Table;

    fn validate(&self) -> Result<(), ValidationError>;

    fn into_assignments(self) -> Vec<Assignment<<Self::Row as Table>::Field>>;
}

// =============================================================================
// Connection Handling
// =============================================================================

enum Source<'c> {
    Pool(SqlitePool),
    Conn(&'c mut SqliteConnection),
}

/// The connection one repository call runs on.
pub(crate) enum Handle<'a> {
    Pooled(PoolConnection<Sqlite>),
    Tx(Transaction<'static, Sqlite>),
    Borrowed(&'a mut SqliteConnection),
}

impl Handle<'_> {
    /// Commits a transaction begun for this call; no-op otherwise.
    pub(crate) async fn commit(self) -> DbResult<()> {
        if let Handle::Tx(tx) = self {
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Deref for Handle<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            Handle::Pooled(conn) => &**conn,
            Handle::Tx(tx) => &**tx,
            Handle::Borrowed(conn) => &**conn,
        }
    }
}

impl DerefMut for Handle<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Handle::Pooled(conn) => &mut **conn,
            Handle::Tx(tx) => &mut **tx,
            Handle::Borrowed(conn) => &mut **conn,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Typed access to one table.
///
/// Obtained from [`Database`](crate::Database) (runs on the pool) or from
/// [`TxContext`](crate::TxContext) (runs inside that transaction).
pub struct Repository<'c, T> {
    source: Source<'c>,
    capture: bool,
    _table: PhantomData<fn() -> T>,
}

impl<'c, T: Table> Repository<'c, T> {
    pub(crate) fn new(pool: SqlitePool, capture: bool) -> Self {
        Repository {
            source: Source::Pool(pool),
            capture,
            _table: PhantomData,
        }
    }

    pub(crate) fn in_tx(conn: &'c mut SqliteConnection, capture: bool) -> Self {
        Repository {
            source: Source::Conn(conn),
            capture,
            _table: PhantomData,
        }
    }

    /// Whether writes through this repository are queued for sync.
    pub fn captures(&self) -> bool {
        self.capture && T::CAPTURED
    }

    pub(crate) async fn reader(&mut self) -> DbResult<Handle<'_>> {
        match &mut self.source {
            Source::Pool(pool) => Ok(Handle::Pooled(pool.acquire().await?)),
            Source::Conn(conn) => Ok(Handle::Borrowed(&mut **conn)),
        }
    }

    /// A connection for writes: a fresh `BEGIN IMMEDIATE` transaction on the
    /// pool, or the caller's transaction.
    ///
    /// The write lock is taken up front so read-then-write calls queue on
    /// the busy timeout instead of failing to upgrade a read lock.
    pub(crate) async fn writer(&mut self) -> DbResult<Handle<'_>> {
        match &mut self.source {
            Source::Pool(pool) => Ok(Handle::Tx(pool.begin_with(BEGIN_IMMEDIATE).await?)),
            Source::Conn(conn) => Ok(Handle::Borrowed(&mut **conn)),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn find_unique(&mut self, id: &str) -> DbResult<Option<T>> {
        let mut conn = self.reader().await?;
        ops::find_unique(&mut conn, id).await
    }

    /// Like [`find_unique`](Self::find_unique), failing with
    /// [`DbError::NotFound`] when the row is missing.
    pub async fn get(&mut self, id: &str) -> DbResult<T> {
        self.find_unique(id)
            .await?
            .ok_or_else(|| DbError::not_found(T::NAME, id))
    }

    pub async fn find_first(&mut self, args: FindMany<T::Field>) -> DbResult<Option<T>> {
        let mut rows = self.find_many(args.take(1)).await?;
        Ok(rows.pop())
    }

    pub async fn find_many(&mut self, args: FindMany<T::Field>) -> DbResult<Vec<T>> {
        let mut conn = self.reader().await?;
        ops::find_many(&mut conn, &args).await
    }

    pub async fn count(&mut self, filter: Option<Filter<T::Field>>) -> DbResult<i64> {
        let mut conn = self.reader().await?;
        ops::count::<T>(&mut conn, filter.as_ref()).await
    }

    pub async fn exists(&mut self, filter: Filter<T::Field>) -> DbResult<bool> {
        Ok(self.find_first(FindMany::from(filter)).await?.is_some())
    }

    pub async fn aggregate(&mut self, args: Aggregate<T::Field>) -> DbResult<AggregateResult> {
        let mut conn = self.reader().await?;
        ops::aggregate::<T>(&mut conn, &args).await
    }

    pub async fn group_by(&mut self, args: GroupBy<T::Field>) -> DbResult<Vec<GroupRow>> {
        let mut conn = self.reader().await?;
        ops::group_by::<T>(&mut conn, &args).await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Validates `input` and inserts the row it builds.
    pub async fn create<I>(&mut self, input: I) -> DbResult<T>
    where
        I: Insertable<Row = T>,
    {
        input.validate()?;
        let row = input.into_row()?;
        self.insert(&row).await
    }

    /// Validates every input, then inserts them in one transaction.
    pub async fn create_many<I>(&mut self, inputs: Vec<I>, skip_duplicates: bool) -> DbResult<u64>
    where
        I: Insertable<Row = T>,
    {
        for input in &inputs {
            input.validate()?;
        }
        let rows = inputs
            .into_iter()
            .map(Insertable::into_row)
            .collect::<DbResult<Vec<_>>>()?;
        self.insert_many(&rows, skip_duplicates).await
    }

    /// Inserts a fully built row.
    pub async fn insert(&mut self, row: &T) -> DbResult<T> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let inserted = ops::insert(&mut conn, row, capture).await?;
        conn.commit().await?;
        Ok(inserted)
    }

    pub async fn insert_many(&mut self, rows: &[T], skip_duplicates: bool) -> DbResult<u64> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let written = ops::insert_many(&mut conn, rows, skip_duplicates, capture).await?;
        conn.commit().await?;
        Ok(written)
    }

    /// Validates `patch` and applies it. An empty patch returns the row
    /// untouched.
    pub async fn update<P>(&mut self, id: &str, patch: P) -> DbResult<T>
    where
        P: Patch<Row = T>,
    {
        patch.validate()?;
        let assignments = patch.into_assignments();
        if assignments.is_empty() {
            return self.get(id).await;
        }
        self.update_fields(id, &assignments).await
    }

    pub async fn update_fields(&mut self, id: &str, assignments: &[Assignment<T::Field>]) -> DbResult<T> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let updated = ops::update_fields(&mut conn, id, assignments, capture).await?;
        conn.commit().await?;
        Ok(updated)
    }

    /// Returns how many rows matched.
    pub async fn update_many(
        &mut self,
        filter: Option<Filter<T::Field>>,
        assignments: &[Assignment<T::Field>],
    ) -> DbResult<u64> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let updated = ops::update_many::<T>(&mut conn, filter.as_ref(), assignments, capture).await?;
        conn.commit().await?;
        Ok(updated.len() as u64)
    }

    /// Deletes a row and returns it.
    pub async fn delete(&mut self, id: &str) -> DbResult<T> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let deleted = ops::delete(&mut conn, id, capture).await?;
        conn.commit().await?;
        Ok(deleted)
    }

    pub async fn delete_many(&mut self, filter: Option<Filter<T::Field>>) -> DbResult<u64> {
        let capture = self.captures();
        let mut conn = self.writer().await?;
        let deleted = ops::delete_many::<T>(&mut conn, filter.as_ref(), capture).await?;
        conn.commit().await?;
        Ok(deleted)
    }
}

// =============================================================================
// Shared Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use dukan_core::{
        NewCategory, NewProduct, NewProductVariant, NewUser, Permission, PermissionSet,
        Product, ProductVariant, User,
    };

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A WAL database file with a real pool, for tests where several
    /// connections contend for the write lock.
    pub async fn file_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("dukan.db")).max_connections(5))
            .await
            .unwrap();
        (dir, db)
    }

    pub async fn db_without_capture() -> Database {
        Database::new(DbConfig::in_memory().capture_changes(false))
            .await
            .unwrap()
    }

    pub async fn cashier(db: &Database) -> User {
        db.users()
            .create(
                NewUser::new("ravi", "secret-1", "Ravi")
                    .with_permissions([Permission::CreateBill].into_iter().collect::<PermissionSet>()),
            )
            .await
            .unwrap()
    }

    pub async fn product(db: &Database) -> Product {
        let category = db.categories().create(NewCategory::new("Kurtas")).await.unwrap();
        db.products()
            .create(NewProduct::new("Cotton Kurta", category.id))
            .await
            .unwrap()
    }

    pub async fn variant(db: &Database, product: &Product, sku: &str, barcode: &str) -> ProductVariant {
        let mut input = NewProductVariant::new(&product.id, sku, barcode, 999.0, 899.0);
        input.size = Some("M".to_string());
        input.stock = 10;
        input.min_stock = 2;
        db.variants().create(input).await.unwrap()
    }
}

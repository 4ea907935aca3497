//! # dukan-db: Database Layer for Dukan POS
//!
//! SQLite storage for the retail schema: pool, embedded migrations, a typed
//! query layer, per-entity repositories, interactive transactions and
//! change capture into the sync queue.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukan POS Data Flow                              │
//! │                                                                         │
//! │  dukan CLI (lookup 8901234567890)        dukan-sync processor          │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dukan-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database    │  │ Repository<T> │  │   query layer    │  │   │
//! │  │   │   (pool.rs)   │◄─│ users, sales, │─►│ Filter, OrderBy, │  │   │
//! │  │   │  transaction  │  │ variants, ... │  │ Assignment, ...  │  │   │
//! │  │   └───────────────┘  └───────┬───────┘  └──────────────────┘  │   │
//! │  │                              │ every write                     │   │
//! │  │                              ▼                                 │   │
//! │  │                       SyncQueue row (same transaction)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`schema`] - Table metadata and column enums
//! - [`query`] - Filters, ordering, pagination, aggregates, update operators
//! - [`repository`] - The generic repository and per-entity operations
//! - [`transaction`] - Interactive transactions
//! - [`seed`] - Demo catalog for development
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dukan_db::{Database, DbConfig, Filter, ProductVariantField};
//!
//! let db = Database::new(DbConfig::new("path/to/dukan.db")).await?;
//!
//! let variant = db.variants().lookup("8901234567890").await?;
//! let low = db.variants().low_stock().await?;
//! let active = db
//!     .variants()
//!     .count(Some(Filter::eq(ProductVariantField::IsActive, true)))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
mod ops;
pub mod pool;
pub mod query;
pub mod repository;
pub mod schema;
pub mod seed;
pub mod transaction;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};
pub use transaction::{IsolationLevel, TransactionOptions, TxContext};

pub use query::{
    Aggregate, AggregateResult, Assignment, Column, ColumnKind, CountHaving, Filter, FindMany,
    GroupBy, GroupOrder, GroupRow, OrderBy, SortOrder, UpdateOp, Value,
};
pub use schema::{
    AuditLogField, CategoryField, CustomerField, InventoryMovementField, PrinterConfigField,
    ProductField, ProductVariantField, SaleField, SaleItemField, SettingField, SyncQueueField,
    Table, UserField,
};

// Repository re-exports for convenience
pub use repository::sync::SyncQueueStats;
pub use repository::user::{hash_password, verify_password};
pub use repository::{
    AuditLogRepository, CategoryRepository, CustomerRepository, Insertable,
    InventoryRepository, Patch, PrinterConfigRepository, ProductRepository,
    ProductVariantRepository, Repository, SaleItemRepository, SaleRepository,
    SettingRepository, SyncQueueRepository, UserRepository,
};

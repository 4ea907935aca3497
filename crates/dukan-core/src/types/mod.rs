//! # Domain Types
//!
//! Entity models of the Dukan retail schema and their write inputs.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Retail Schema                                   │
//! │                                                                         │
//! │  ┌──────────┐ 1   N ┌──────────┐ 1   N ┌────────────────┐              │
//! │  │ Category │──────►│ Product  │──────►│ ProductVariant │              │
//! │  └──────────┘       └──────────┘       │ sku, barcode   │              │
//! │                                         │ stock,minStock │              │
//! │                                         └───┬────────┬───┘              │
//! │                                           1 │        │ 1                │
//! │                                           N ▼        ▼ N                │
//! │  ┌──────────┐ 1   N ┌──────────┐ 1   N ┌──────────┐ ┌─────────────────┐│
//! │  │   User   │──────►│   Sale   │──────►│ SaleItem │ │InventoryMovement││
//! │  │ 16 flags │       │ billNo   │       └──────────┘ └─────────────────┘│
//! │  └────┬─────┘       └──────────┘                                       │
//! │     1 │ N (optional)                                                    │
//! │       ▼                                                                 │
//! │  ┌──────────┐   Standalone: Customer, Setting, PrinterConfig,          │
//! │  │ AuditLog │               SyncQueue                                  │
//! │  └──────────┘                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input Shapes
//! Every entity has three shapes:
//! - the model (`Product`), one stored row
//! - a create input (`NewProduct`), defaults applied by serde
//! - a patch (`ProductUpdate`), where `None` leaves a column alone,
//!   `Some(None)` clears a nullable column and numeric columns take a
//!   [`FieldUpdate`](crate::update::FieldUpdate)

mod audit;
mod catalog;
mod customer;
mod inventory;
mod sale;
mod settings;
mod sync;
mod user;

pub use audit::{AuditLog, NewAuditLog};
pub use catalog::{
    Category, CategoryUpdate, CategoryWithCount, NewCategory, NewProduct, NewProductVariant,
    Product, ProductUpdate, ProductVariant, ProductVariantUpdate, ProductWithVariants,
};
pub use customer::{Customer, CustomerUpdate, NewCustomer};
pub use inventory::{InventoryMovement, NewInventoryMovement};
pub use sale::{NewSale, NewSaleItem, Sale, SaleItem, SaleUpdate, SaleWithItems};
pub use settings::{NewPrinterConfig, PrinterConfig, PrinterConfigUpdate, Setting};
pub use sync::{NewSyncQueueEntry, SyncAction, SyncQueueEntry, SyncStatus};
pub use user::{NewUser, User, UserUpdate};

/// Generates a new primary key (UUID v4, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn default_true() -> bool {
    true
}

//! # dukan-core: Pure Domain Types for Dukan POS
//!
//! This crate holds the entity models of the retail schema together with
//! their create/update inputs, the user permission model and input
//! validation. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukan POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    dukan CLI / frontend                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │permissions │  │  update   │  │ validation│ │   │
//! │  │   │  User     │  │ Permission │  │FieldUpdate│  │   rules   │ │   │
//! │  │   │  Sale ... │  │ PermSet    │  │  patches  │  │  checks   │ │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dukan-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity models and their create/update inputs
//! - [`permissions`] - The closed permission enum over the User flag columns
//! - [`update`] - Numeric field update operators and patch helpers
//! - [`validation`] - Input format validation
//! - [`error`] - Domain error types
//!
//! ## Wire Names
//! Rust fields are snake_case. Serialized names (JSON, TypeScript, SQL
//! columns) are the camelCase names of the stored schema, e.g.
//! `ProductVariant.selling_price` is `sellingPrice` everywhere outside Rust.
//!
//! ## Money Fields
//! Money columns (`mrp`, `grandTotal`, `cgst`, ...) are stored as floats and
//! carried as `f64`. This crate never derives one money field from another.

pub mod error;
pub mod permissions;
pub mod types;
pub mod update;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use permissions::{Permission, PermissionSet};
pub use types::*;
pub use update::FieldUpdate;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Role assigned to users created without an explicit role.
pub const DEFAULT_ROLE: &str = "cashier";

/// Payment method stored when a sale does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

/// Status stored when a sale does not name one.
pub const DEFAULT_SALE_STATUS: &str = "completed";

/// Paper width (mm) for printer configs created without one.
pub const DEFAULT_PRINTER_WIDTH: i64 = 80;

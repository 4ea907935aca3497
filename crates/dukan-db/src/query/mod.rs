//! # Query Layer
//!
//! Typed building blocks for reads and writes against any table.
//!
//! ## Shape of a Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     FindMany<ProductVariantField>                       │
//! │                                                                         │
//! │  filter:   And[ Eq(IsActive, true), Lte(Stock, 5) ]                    │
//! │  order_by: [ Stock asc, Sku asc ]                                      │
//! │  skip: 20   take: 10                                                   │
//! │                                                                         │
//! │                         │ rendered by QueryBuilder                      │
//! │                         ▼                                               │
//! │  SELECT * FROM "ProductVariant"                                        │
//! │  WHERE ("isActive" = ? AND "stock" <= ?)                               │
//! │  ORDER BY "stock" ASC, "sku" ASC LIMIT ? OFFSET ?                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Column names never come from user input: every table has a column enum
//! (`UserField`, `SaleField`, ...) implementing [`Column`], and values are
//! always bound as parameters.
//!
//! ## Pieces
//! - [`Filter`] - where clauses, combinable with AND / OR / NOT
//! - [`FindMany`] / [`OrderBy`] - ordering and pagination
//! - [`Assignment`] - `SET` clauses, including relative numeric updates
//! - [`Aggregate`] / [`GroupBy`] - count, sum, avg, min, max

mod aggregate;
mod filter;
mod find;
mod update;

pub use aggregate::{Aggregate, AggregateResult, CountHaving, GroupBy, GroupOrder, GroupRow};
pub use filter::Filter;
pub use find::{FindMany, OrderBy, SortOrder};
pub use update::{Assignment, UpdateOp};

pub(crate) use aggregate::{push_aggregate, push_group_by, read_aggregate, read_group_row};
pub(crate) use filter::push_where;
pub(crate) use find::push_order_and_page;
pub(crate) use update::push_assignments;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use dukan_core::{SyncAction, SyncStatus, ValidationError};

// =============================================================================
// Columns
// =============================================================================

/// Storage kind of a column, as declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int,
    Float,
    Bool,
    DateTime,
}

impl ColumnKind {
    /// Int and Float columns accept arithmetic updates and aggregates.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Int | ColumnKind::Float)
    }
}

/// A column of one table.
pub trait Column: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Column name as stored (`sellingPrice`).
    fn name(&self) -> &'static str;

    fn kind(&self) -> ColumnKind;

    /// Every column, in table order.
    fn all() -> &'static [Self];

    /// Looks a column up by its stored name.
    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.name() == name)
    }

    /// `"sellingPrice"`, quoted for SQL.
    fn quoted(&self) -> String {
        format!("\"{}\"", self.name())
    }
}

/// Declares a column enum and its [`Column`] impl.
macro_rules! columns {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => ($column:literal, $kind:ident) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant ),+
        }

        impl $crate::query::Column for $name {
            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $column ),+
                }
            }

            fn kind(&self) -> $crate::query::ColumnKind {
                match self {
                    $( $name::$variant => $crate::query::ColumnKind::$kind ),+
                }
            }

            fn all() -> &'static [Self] {
                &[ $( $name::$variant ),+ ]
            }
        }
    };
}

pub(crate) use columns;

/// Rejects an operation that only makes sense on numeric columns.
pub(crate) fn require_numeric<F: Column>(field: F, operation: &str) -> Result<(), ValidationError> {
    if field.kind().is_numeric() {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedOperation {
            field: field.name().to_string(),
            operation: operation.to_string(),
        })
    }
}

// =============================================================================
// Values
// =============================================================================

/// A value bound into a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for a numeric zero, used to reject division by zero.
    pub(crate) fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<SyncStatus> for Value {
    fn from(v: SyncStatus) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl From<SyncAction> for Value {
    fn from(v: SyncAction) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Binds `value` as the next parameter.
pub(crate) fn push_value<'q>(qb: &mut QueryBuilder<'q, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            qb.push_bind(Option::<String>::None);
        }
        Value::Text(v) => {
            qb.push_bind(v.clone());
        }
        Value::Int(v) => {
            qb.push_bind(*v);
        }
        Value::Float(v) => {
            qb.push_bind(*v);
        }
        Value::Bool(v) => {
            qb.push_bind(*v);
        }
        Value::DateTime(v) => {
            qb.push_bind(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    columns! {
        enum TestField {
            Name => ("name", Text),
            Stock => ("stock", Int),
            Price => ("sellingPrice", Float),
        }
    }

    #[test]
    fn test_column_lookup() {
        assert_eq!(TestField::all().len(), 3);
        assert_eq!(TestField::parse("sellingPrice"), Some(TestField::Price));
        assert_eq!(TestField::parse("selling_price"), None);
        assert_eq!(TestField::Price.quoted(), "\"sellingPrice\"");
    }

    #[test]
    fn test_require_numeric() {
        assert!(require_numeric(TestField::Stock, "sum").is_ok());
        let err = require_numeric(TestField::Name, "sum").unwrap_err();
        assert_eq!(err.to_string(), "sum is not supported on name");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(SyncStatus::Pending), Value::Text("pending".to_string()));
        assert!(Value::Int(0).is_zero());
        assert!(!Value::Float(0.5).is_zero());
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
    }
}

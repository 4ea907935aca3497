//! Aggregates and group-by.
//!
//! ## Example: takings per payment method
//! ```text
//! GroupBy::new([SaleField::PaymentMethod])
//!     .filter(Filter::eq(SaleField::Status, "completed"))
//!     .count()
//!     .sum(SaleField::GrandTotal)
//!     .order_by(GroupOrder::Sum(SaleField::GrandTotal, SortOrder::Desc))
//!
//! SELECT "paymentMethod", COUNT(*), CAST(SUM("grandTotal") AS REAL)
//! FROM "Sale" WHERE "status" = ?
//! GROUP BY "paymentMethod" ORDER BY SUM("grandTotal") DESC
//!
//!   paymentMethod │ _count │ _sum.grandTotal
//!   ──────────────┼────────┼────────────────
//!   cash          │     41 │        38250.00
//!   upi           │     17 │        21480.50
//! ```
//! Sum, avg, min and max are numeric-only and always come back as `f64`
//! (`None` when no row contributed).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use dukan_core::ValidationError;

use super::filter::push_where;
use super::find::push_page;
use super::{push_value, require_numeric, Column, ColumnKind, Filter, SortOrder, Value};

// =============================================================================
// Aggregate
// =============================================================================

/// Aggregates over all rows matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<F> {
    pub filter: Option<Filter<F>>,
    pub count: bool,
    pub sum: Vec<F>,
    pub avg: Vec<F>,
    pub min: Vec<F>,
    pub max: Vec<F>,
}

impl<F> Default for Aggregate<F> {
    fn default() -> Self {
        Aggregate {
            filter: None,
            count: false,
            sum: Vec::new(),
            avg: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }
}

impl<F: Column> Aggregate<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn sum(mut self, field: F) -> Self {
        self.sum.push(field);
        self
    }

    pub fn avg(mut self, field: F) -> Self {
        self.avg.push(field);
        self
    }

    pub fn min(mut self, field: F) -> Self {
        self.min.push(field);
        self
    }

    pub fn max(mut self, field: F) -> Self {
        self.max.push(field);
        self
    }
}

/// Result of an [`Aggregate`], keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(rename = "_sum")]
    pub sum: BTreeMap<String, Option<f64>>,
    #[serde(rename = "_avg")]
    pub avg: BTreeMap<String, Option<f64>>,
    #[serde(rename = "_min")]
    pub min: BTreeMap<String, Option<f64>>,
    #[serde(rename = "_max")]
    pub max: BTreeMap<String, Option<f64>>,
}

impl AggregateResult {
    pub fn sum_of<F: Column>(&self, field: F) -> Option<f64> {
        self.sum.get(field.name()).copied().flatten()
    }

    pub fn avg_of<F: Column>(&self, field: F) -> Option<f64> {
        self.avg.get(field.name()).copied().flatten()
    }

    pub fn min_of<F: Column>(&self, field: F) -> Option<f64> {
        self.min.get(field.name()).copied().flatten()
    }

    pub fn max_of<F: Column>(&self, field: F) -> Option<f64> {
        self.max.get(field.name()).copied().flatten()
    }

    fn store(&mut self, slot: &Slot, row: &SqliteRow, index: usize) -> Result<(), sqlx::Error> {
        let name = slot.column.to_string();
        match slot.kind {
            SlotKind::Count => self.count = Some(row.try_get::<i64, _>(index)?),
            SlotKind::Sum => {
                self.sum.insert(name, row.try_get::<Option<f64>, _>(index)?);
            }
            SlotKind::Avg => {
                self.avg.insert(name, row.try_get::<Option<f64>, _>(index)?);
            }
            SlotKind::Min => {
                self.min.insert(name, row.try_get::<Option<f64>, _>(index)?);
            }
            SlotKind::Max => {
                self.max.insert(name, row.try_get::<Option<f64>, _>(index)?);
            }
            SlotKind::Key(_) => {}
        }
        Ok(())
    }
}

// =============================================================================
// Group By
// =============================================================================

/// `HAVING` condition on the row count of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountHaving {
    Eq(i64),
    Gt(i64),
    Gte(i64),
    Lt(i64),
    Lte(i64),
}

impl CountHaving {
    fn parts(&self) -> (&'static str, i64) {
        match *self {
            CountHaving::Eq(n) => ("=", n),
            CountHaving::Gt(n) => (">", n),
            CountHaving::Gte(n) => (">=", n),
            CountHaving::Lt(n) => ("<", n),
            CountHaving::Lte(n) => ("<=", n),
        }
    }
}

/// Ordering of groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupOrder<F> {
    /// By a group key; the column must be one of the keys.
    Key(F, SortOrder),
    /// By the row count.
    Count(SortOrder),
    /// By the sum of a numeric column.
    Sum(F, SortOrder),
}

/// Groups rows by one or more key columns and aggregates each group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy<F> {
    pub by: Vec<F>,
    pub filter: Option<Filter<F>>,
    pub count: bool,
    pub sum: Vec<F>,
    pub avg: Vec<F>,
    pub min: Vec<F>,
    pub max: Vec<F>,
    pub having: Option<CountHaving>,
    pub order_by: Vec<GroupOrder<F>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl<F: Column> GroupBy<F> {
    pub fn new(by: impl IntoIterator<Item = F>) -> Self {
        GroupBy {
            by: by.into_iter().collect(),
            filter: None,
            count: false,
            sum: Vec::new(),
            avg: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
            having: None,
            order_by: Vec::new(),
            skip: None,
            take: None,
        }
    }

    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn sum(mut self, field: F) -> Self {
        self.sum.push(field);
        self
    }

    pub fn avg(mut self, field: F) -> Self {
        self.avg.push(field);
        self
    }

    pub fn min(mut self, field: F) -> Self {
        self.min.push(field);
        self
    }

    pub fn max(mut self, field: F) -> Self {
        self.max.push(field);
        self
    }

    pub fn having(mut self, having: CountHaving) -> Self {
        self.having = Some(having);
        self
    }

    pub fn order_by(mut self, order: GroupOrder<F>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }
}

/// One group: its key values plus the requested aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupRow {
    #[serde(flatten)]
    pub keys: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub aggregates: AggregateResult,
}

impl GroupRow {
    /// The value of a key column in this group.
    pub fn key<F: Column>(&self, field: F) -> &Value {
        self.keys.get(field.name()).unwrap_or(&Value::Null)
    }

    pub fn count(&self) -> Option<i64> {
        self.aggregates.count
    }

    pub fn sum_of<F: Column>(&self, field: F) -> Option<f64> {
        self.aggregates.sum_of(field)
    }

    pub fn avg_of<F: Column>(&self, field: F) -> Option<f64> {
        self.aggregates.avg_of(field)
    }

    pub fn min_of<F: Column>(&self, field: F) -> Option<f64> {
        self.aggregates.min_of(field)
    }

    pub fn max_of<F: Column>(&self, field: F) -> Option<f64> {
        self.aggregates.max_of(field)
    }
}

// =============================================================================
// Rendering and Decoding
// =============================================================================

/// What a selected column holds, in select order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Slot {
    kind: SlotKind,
    column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotKind {
    Key(ColumnKind),
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

fn push_aggregate_columns<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    slots: &mut Vec<Slot>,
    count: bool,
    lists: [(&[F], SlotKind, &'static str); 4],
) -> Result<(), ValidationError> {
    if count {
        if !slots.is_empty() {
            qb.push(", ");
        }
        qb.push("COUNT(*)");
        slots.push(Slot {
            kind: SlotKind::Count,
            column: "_all",
        });
    }

    for (fields, kind, function) in lists {
        for field in fields {
            require_numeric(*field, &function.to_lowercase())?;
            if !slots.is_empty() {
                qb.push(", ");
            }
            qb.push(format!("CAST({}({}) AS REAL)", function, field.quoted()));
            slots.push(Slot {
                kind,
                column: field.name(),
            });
        }
    }

    Ok(())
}

/// Renders a whole aggregate query into `qb`, which must hold `SELECT `.
pub(crate) fn push_aggregate<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    table: &str,
    args: &Aggregate<F>,
) -> Result<Vec<Slot>, ValidationError> {
    let mut slots = Vec::new();
    push_aggregate_columns(
        qb,
        &mut slots,
        args.count,
        [
            (args.sum.as_slice(), SlotKind::Sum, "SUM"),
            (args.avg.as_slice(), SlotKind::Avg, "AVG"),
            (args.min.as_slice(), SlotKind::Min, "MIN"),
            (args.max.as_slice(), SlotKind::Max, "MAX"),
        ],
    )?;

    if slots.is_empty() {
        return Err(ValidationError::Required {
            field: "aggregate".to_string(),
        });
    }

    qb.push(format!(" FROM \"{}\"", table));
    push_where(qb, args.filter.as_ref())?;
    Ok(slots)
}

/// Renders a whole group-by query into `qb`, which must hold `SELECT `.
pub(crate) fn push_group_by<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    table: &str,
    args: &GroupBy<F>,
) -> Result<Vec<Slot>, ValidationError> {
    if args.by.is_empty() {
        return Err(ValidationError::Required {
            field: "by".to_string(),
        });
    }

    let mut slots = Vec::new();
    for (i, field) in args.by.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(field.quoted());
        slots.push(Slot {
            kind: SlotKind::Key(field.kind()),
            column: field.name(),
        });
    }

    push_aggregate_columns(
        qb,
        &mut slots,
        args.count,
        [
            (args.sum.as_slice(), SlotKind::Sum, "SUM"),
            (args.avg.as_slice(), SlotKind::Avg, "AVG"),
            (args.min.as_slice(), SlotKind::Min, "MIN"),
            (args.max.as_slice(), SlotKind::Max, "MAX"),
        ],
    )?;

    qb.push(format!(" FROM \"{}\"", table));
    push_where(qb, args.filter.as_ref())?;

    qb.push(" GROUP BY ");
    for (i, field) in args.by.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(field.quoted());
    }

    if let Some(having) = args.having {
        let (op, n) = having.parts();
        qb.push(" HAVING COUNT(*) ").push(op).push(" ");
        push_value(qb, &Value::Int(n));
    }

    for (i, order) in args.order_by.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        match order {
            GroupOrder::Key(field, dir) => {
                if !args.by.contains(field) {
                    return Err(ValidationError::NotAllowed {
                        field: field.name().to_string(),
                        allowed: args.by.iter().map(|f| f.name().to_string()).collect(),
                    });
                }
                qb.push(field.quoted()).push(" ").push(dir.sql());
            }
            GroupOrder::Count(dir) => {
                qb.push("COUNT(*) ").push(dir.sql());
            }
            GroupOrder::Sum(field, dir) => {
                require_numeric(*field, "sum")?;
                qb.push(format!("SUM({}) {}", field.quoted(), dir.sql()));
            }
        }
    }

    push_page(qb, args.skip, args.take)?;
    Ok(slots)
}

pub(crate) fn read_aggregate(row: &SqliteRow, slots: &[Slot]) -> Result<AggregateResult, sqlx::Error> {
    let mut result = AggregateResult::default();
    for (index, slot) in slots.iter().enumerate() {
        result.store(slot, row, index)?;
    }
    Ok(result)
}

pub(crate) fn read_group_row(row: &SqliteRow, slots: &[Slot]) -> Result<GroupRow, sqlx::Error> {
    let mut group = GroupRow::default();
    for (index, slot) in slots.iter().enumerate() {
        match slot.kind {
            SlotKind::Key(kind) => {
                group
                    .keys
                    .insert(slot.column.to_string(), read_key(row, index, kind)?);
            }
            _ => group.aggregates.store(slot, row, index)?,
        }
    }
    Ok(group)
}

fn read_key(row: &SqliteRow, index: usize, kind: ColumnKind) -> Result<Value, sqlx::Error> {
    Ok(match kind {
        ColumnKind::Text => row.try_get::<Option<String>, _>(index)?.into(),
        ColumnKind::Int => row.try_get::<Option<i64>, _>(index)?.into(),
        ColumnKind::Float => row.try_get::<Option<f64>, _>(index)?.into(),
        ColumnKind::Bool => row
            .try_get::<Option<i64>, _>(index)?
            .map(|v| Value::Bool(v != 0))
            .unwrap_or(Value::Null),
        ColumnKind::DateTime => row.try_get::<Option<DateTime<Utc>>, _>(index)?.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::columns;

    columns! {
        enum Field {
            Method => ("paymentMethod", Text),
            Status => ("status", Text),
            Total => ("grandTotal", Float),
        }
    }

    #[test]
    fn test_group_by_sql() {
        let args = GroupBy::new([Field::Method])
            .filter(Filter::eq(Field::Status, "completed"))
            .count()
            .sum(Field::Total)
            .having(CountHaving::Gte(2))
            .order_by(GroupOrder::Sum(Field::Total, SortOrder::Desc))
            .take(5);

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        let slots = push_group_by(&mut qb, "Sale", &args).unwrap();

        assert_eq!(slots.len(), 3);
        assert_eq!(
            qb.sql(),
            "SELECT \"paymentMethod\", COUNT(*), CAST(SUM(\"grandTotal\") AS REAL) FROM \"Sale\" \
             WHERE \"status\" = ? GROUP BY \"paymentMethod\" HAVING COUNT(*) >= ? \
             ORDER BY SUM(\"grandTotal\") DESC LIMIT ?"
        );
    }

    #[test]
    fn test_aggregate_rejects_text_columns() {
        let args = Aggregate::new().sum(Field::Status);
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        assert!(matches!(
            push_aggregate(&mut qb, "Sale", &args),
            Err(ValidationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_aggregate_needs_something_to_compute() {
        let args = Aggregate::<Field>::new();
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        assert!(push_aggregate(&mut qb, "Sale", &args).is_err());
    }

    #[test]
    fn test_order_by_non_key_rejected() {
        let args = GroupBy::new([Field::Method]).order_by(GroupOrder::Key(Field::Status, SortOrder::Asc));
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        assert!(matches!(
            push_group_by(&mut qb, "Sale", &args),
            Err(ValidationError::NotAllowed { .. })
        ));
    }
}

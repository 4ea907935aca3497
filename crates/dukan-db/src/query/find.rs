//! Ordering and pagination.

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use dukan_core::ValidationError;

use super::{Column, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: Column> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        OrderBy {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        OrderBy {
            field,
            order: SortOrder::Desc,
        }
    }
}

/// Arguments of a multi-row read.
///
/// ## Example
/// ```rust,ignore
/// let page = FindMany::new()
///     .filter(Filter::eq(ProductVariantField::IsActive, true))
///     .order_by(OrderBy::asc(ProductVariantField::Sku))
///     .skip(40)
///     .take(20);
/// let variants = db.variants().find_many(page).await?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FindMany<F> {
    pub filter: Option<Filter<F>>,
    pub order_by: Vec<OrderBy<F>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl<F> Default for FindMany<F> {
    fn default() -> Self {
        FindMany {
            filter: None,
            order_by: Vec::new(),
            skip: None,
            take: None,
        }
    }
}

impl<F: Column> FindMany<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter, AND-ing it with any filter already set.
    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Adds an ordering key after the existing ones.
    pub fn order_by(mut self, order: OrderBy<F>) -> Self {
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

impl<F: Column> From<Filter<F>> for FindMany<F> {
    fn from(filter: Filter<F>) -> Self {
        FindMany::new().filter(filter)
    }
}

/// Appends `ORDER BY` and `LIMIT/OFFSET`.
///
/// SQLite has no OFFSET without LIMIT, so a bare skip becomes
/// `LIMIT -1 OFFSET n`.
pub(crate) fn push_order_and_page<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    order_by: &[OrderBy<F>],
    skip: Option<i64>,
    take: Option<i64>,
) -> Result<(), ValidationError> {
    push_order(qb, order_by);
    push_page(qb, skip, take)
}

pub(crate) fn push_order<'q, F: Column>(qb: &mut QueryBuilder<'q, Sqlite>, order_by: &[OrderBy<F>]) {
    for (i, order) in order_by.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(order.field.quoted()).push(" ").push(order.order.sql());
    }
}

pub(crate) fn push_page<'q>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    skip: Option<i64>,
    take: Option<i64>,
) -> Result<(), ValidationError> {
    if let Some(skip) = skip {
        if skip < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "skip".to_string(),
            });
        }
    }
    if let Some(take) = take {
        if take < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "take".to_string(),
            });
        }
    }

    match (take, skip) {
        (Some(take), Some(skip)) => {
            qb.push(" LIMIT ").push_bind(take).push(" OFFSET ").push_bind(skip);
        }
        (Some(take), None) => {
            qb.push(" LIMIT ").push_bind(take);
        }
        (None, Some(skip)) => {
            qb.push(" LIMIT -1 OFFSET ").push_bind(skip);
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::columns;

    columns! {
        enum Field {
            Sku => ("sku", Text),
            Stock => ("stock", Int),
        }
    }

    fn render(args: &FindMany<Field>) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT *");
        push_order_and_page(&mut qb, &args.order_by, args.skip, args.take).unwrap();
        qb.sql().to_string()
    }

    #[test]
    fn test_order_and_limit() {
        let args = FindMany::new()
            .order_by(OrderBy::asc(Field::Stock))
            .order_by(OrderBy::desc(Field::Sku))
            .take(10);
        assert_eq!(
            render(&args),
            "SELECT * ORDER BY \"stock\" ASC, \"sku\" DESC LIMIT ?"
        );
    }

    #[test]
    fn test_skip_without_take() {
        let args = FindMany::<Field>::new().skip(5);
        assert_eq!(render(&args), "SELECT * LIMIT -1 OFFSET ?");
    }

    #[test]
    fn test_negative_take_rejected() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT *");
        assert!(push_page(&mut qb, None, Some(-1)).is_err());
    }

    #[test]
    fn test_filter_calls_are_anded() {
        let args = FindMany::new()
            .filter(Filter::eq(Field::Sku, "A"))
            .filter(Filter::gt(Field::Stock, 0));
        assert!(matches!(args.filter, Some(Filter::And(ref list)) if list.len() == 2));
    }
}

//! Where-clause filters.

use sqlx::{QueryBuilder, Sqlite};

use dukan_core::ValidationError;

use super::{push_value, Column, ColumnKind, Value};

/// A predicate over the columns `F` of one table.
///
/// ## Null Handling
/// ```text
/// Filter::eq(Field::Port, Value::Null)   →  "port" IS NULL
/// Filter::ne(Field::Port, Value::Null)   →  "port" IS NOT NULL
/// Filter::And(vec![])                    →  1 = 1
/// Filter::Or(vec![]) / In(f, vec![])     →  1 = 0
/// ```
/// `contains`, `starts_with` and `ends_with` use `LIKE`, so they are
/// case-insensitive for ASCII.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<F> {
    Eq(F, Value),
    Ne(F, Value),
    In(F, Vec<Value>),
    NotIn(F, Vec<Value>),
    Lt(F, Value),
    Lte(F, Value),
    Gt(F, Value),
    Gte(F, Value),
    Contains(F, String),
    StartsWith(F, String),
    EndsWith(F, String),
    IsNull(F),
    IsNotNull(F),
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
    Not(Box<Filter<F>>),
}

impl<F: Column> Filter<F> {
    pub fn eq(field: F, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }

    pub fn ne(field: F, value: impl Into<Value>) -> Self {
        Filter::Ne(field, value.into())
    }

    pub fn is_in<V: Into<Value>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn not_in<V: Into<Value>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Filter::NotIn(field, values.into_iter().map(Into::into).collect())
    }

    pub fn lt(field: F, value: impl Into<Value>) -> Self {
        Filter::Lt(field, value.into())
    }

    pub fn lte(field: F, value: impl Into<Value>) -> Self {
        Filter::Lte(field, value.into())
    }

    pub fn gt(field: F, value: impl Into<Value>) -> Self {
        Filter::Gt(field, value.into())
    }

    pub fn gte(field: F, value: impl Into<Value>) -> Self {
        Filter::Gte(field, value.into())
    }

    /// `from <= field < to`.
    pub fn between(field: F, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Filter::And(vec![Filter::gte(field, from), Filter::lt(field, to)])
    }

    pub fn contains(field: F, needle: impl Into<String>) -> Self {
        Filter::Contains(field, needle.into())
    }

    pub fn starts_with(field: F, prefix: impl Into<String>) -> Self {
        Filter::StartsWith(field, prefix.into())
    }

    pub fn ends_with(field: F, suffix: impl Into<String>) -> Self {
        Filter::EndsWith(field, suffix.into())
    }

    pub fn is_null(field: F) -> Self {
        Filter::IsNull(field)
    }

    pub fn is_not_null(field: F) -> Self {
        Filter::IsNotNull(field)
    }

    /// `self AND other`, flattening nested ANDs.
    pub fn and(self, other: Filter<F>) -> Self {
        match self {
            Filter::And(mut list) => {
                list.push(other);
                Filter::And(list)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening nested ORs.
    pub fn or(self, other: Filter<F>) -> Self {
        match self {
            Filter::Or(mut list) => {
                list.push(other);
                Filter::Or(list)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Appends this predicate as SQL.
    pub(crate) fn push_sql<'q>(&self, qb: &mut QueryBuilder<'q, Sqlite>) -> Result<(), ValidationError> {
        match self {
            Filter::Eq(field, Value::Null) | Filter::IsNull(field) => {
                qb.push(field.quoted()).push(" IS NULL");
            }
            Filter::Ne(field, Value::Null) | Filter::IsNotNull(field) => {
                qb.push(field.quoted()).push(" IS NOT NULL");
            }
            Filter::Eq(field, value) => push_comparison(qb, *field, "=", value),
            Filter::Ne(field, value) => push_comparison(qb, *field, "<>", value),
            Filter::Lt(field, value) => push_comparison(qb, *field, "<", value),
            Filter::Lte(field, value) => push_comparison(qb, *field, "<=", value),
            Filter::Gt(field, value) => push_comparison(qb, *field, ">", value),
            Filter::Gte(field, value) => push_comparison(qb, *field, ">=", value),
            Filter::In(_, values) if values.is_empty() => {
                qb.push("1 = 0");
            }
            Filter::NotIn(_, values) if values.is_empty() => {
                qb.push("1 = 1");
            }
            Filter::In(field, values) => push_list(qb, *field, "IN", values),
            Filter::NotIn(field, values) => push_list(qb, *field, "NOT IN", values),
            Filter::Contains(field, needle) => {
                push_like(qb, *field, "contains", format!("%{}%", escape_like(needle)))?
            }
            Filter::StartsWith(field, prefix) => {
                push_like(qb, *field, "startsWith", format!("{}%", escape_like(prefix)))?
            }
            Filter::EndsWith(field, suffix) => {
                push_like(qb, *field, "endsWith", format!("%{}", escape_like(suffix)))?
            }
            Filter::And(list) if list.is_empty() => {
                qb.push("1 = 1");
            }
            Filter::Or(list) if list.is_empty() => {
                qb.push("1 = 0");
            }
            Filter::And(list) => push_joined(qb, list, " AND ")?,
            Filter::Or(list) => push_joined(qb, list, " OR ")?,
            Filter::Not(inner) => {
                qb.push("NOT (");
                inner.push_sql(qb)?;
                qb.push(")");
            }
        }
        Ok(())
    }
}

/// Appends ` WHERE <filter>` when a filter is given.
pub(crate) fn push_where<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    filter: Option<&Filter<F>>,
) -> Result<(), ValidationError> {
    if let Some(filter) = filter {
        qb.push(" WHERE ");
        filter.push_sql(qb)?;
    }
    Ok(())
}

fn push_comparison<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    field: F,
    op: &str,
    value: &Value,
) {
    qb.push(field.quoted()).push(" ").push(op).push(" ");
    push_value(qb, value);
}

fn push_list<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    field: F,
    op: &str,
    values: &[Value],
) {
    qb.push(field.quoted()).push(" ").push(op).push(" (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, value);
    }
    qb.push(")");
}

fn push_like<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    field: F,
    operation: &str,
    pattern: String,
) -> Result<(), ValidationError> {
    if field.kind() != ColumnKind::Text {
        return Err(ValidationError::UnsupportedOperation {
            field: field.name().to_string(),
            operation: operation.to_string(),
        });
    }
    qb.push(field.quoted()).push(" LIKE ");
    qb.push_bind(pattern);
    qb.push(" ESCAPE '\\'");
    Ok(())
}

fn push_joined<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    list: &[Filter<F>],
    separator: &str,
) -> Result<(), ValidationError> {
    qb.push("(");
    for (i, filter) in list.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        filter.push_sql(qb)?;
    }
    qb.push(")");
    Ok(())
}

/// Escapes LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::columns;

    columns! {
        enum Field {
            Name => ("name", Text),
            Port => ("port", Text),
            Stock => ("stock", Int),
        }
    }

    fn render(filter: &Filter<Field>) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM \"T\"");
        push_where(&mut qb, Some(filter)).unwrap();
        qb.sql().to_string()
    }

    #[test]
    fn test_null_equality() {
        assert_eq!(
            render(&Filter::eq(Field::Port, Value::Null)),
            "SELECT * FROM \"T\" WHERE \"port\" IS NULL"
        );
        assert_eq!(
            render(&Filter::ne(Field::Port, None::<String>)),
            "SELECT * FROM \"T\" WHERE \"port\" IS NOT NULL"
        );
    }

    #[test]
    fn test_composition() {
        let filter = Filter::eq(Field::Name, "x")
            .and(Filter::gt(Field::Stock, 3))
            .and(Filter::eq(Field::Stock, 9).or(Filter::is_null(Field::Port)).negate());
        assert_eq!(
            render(&filter),
            "SELECT * FROM \"T\" WHERE (\"name\" = ? AND \"stock\" > ? AND NOT ((\"stock\" = ? OR \"port\" IS NULL)))"
        );
    }

    #[test]
    fn test_empty_lists() {
        assert!(render(&Filter::And(vec![])).ends_with("WHERE 1 = 1"));
        assert!(render(&Filter::Or(vec![])).ends_with("WHERE 1 = 0"));
        assert!(render(&Filter::is_in(Field::Stock, Vec::<i64>::new())).ends_with("WHERE 1 = 0"));
        assert!(render(&Filter::not_in(Field::Stock, Vec::<i64>::new())).ends_with("WHERE 1 = 1"));
        assert!(render(&Filter::is_in(Field::Stock, [1, 2])).ends_with("\"stock\" IN (?, ?)"));
    }

    #[test]
    fn test_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert!(render(&Filter::contains(Field::Name, "kurta")).ends_with("\"name\" LIKE ? ESCAPE '\\'"));
    }

    #[test]
    fn test_like_on_number_rejected() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1");
        let err = push_where(&mut qb, Some(&Filter::contains(Field::Stock, "1"))).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedOperation { .. }));
    }
}

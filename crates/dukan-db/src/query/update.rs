//! `SET` clauses.

use sqlx::{QueryBuilder, Sqlite};

use dukan_core::{FieldUpdate, ValidationError};

use super::{push_value, require_numeric, Column, ColumnKind, Value};

/// How a column is changed.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(Value),
    Increment(Value),
    Decrement(Value),
    Multiply(Value),
    Divide(Value),
}

/// One column assignment of an update.
///
/// ```text
/// Assignment::set(Field::Status, "void")         "status" = ?
/// Assignment::increment(Field::Stock, 5)         "stock" = "stock" + ?
/// Assignment::from_update(Field::Mrp, FieldUpdate::Multiply(1.1))
///                                                "mrp" = "mrp" * ?
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<F> {
    pub field: F,
    pub op: UpdateOp,
}

impl<F: Column> Assignment<F> {
    pub fn set(field: F, value: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Set(value.into()),
        }
    }

    pub fn increment(field: F, by: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Increment(by.into()),
        }
    }

    pub fn decrement(field: F, by: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Decrement(by.into()),
        }
    }

    pub fn multiply(field: F, by: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Multiply(by.into()),
        }
    }

    pub fn divide(field: F, by: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Divide(by.into()),
        }
    }

    /// Converts a patch field into an assignment.
    pub fn from_update<T: Into<Value>>(field: F, update: FieldUpdate<T>) -> Self {
        match update {
            FieldUpdate::Set(v) => Assignment::set(field, v),
            FieldUpdate::Increment(v) => Assignment::increment(field, v),
            FieldUpdate::Decrement(v) => Assignment::decrement(field, v),
            FieldUpdate::Multiply(v) => Assignment::multiply(field, v),
            FieldUpdate::Divide(v) => Assignment::divide(field, v),
        }
    }

    /// Arithmetic needs a numeric column and a non-null operand; division
    /// needs a non-zero one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (operand, operation) = match &self.op {
            UpdateOp::Set(_) => return Ok(()),
            UpdateOp::Increment(v) => (v, "increment"),
            UpdateOp::Decrement(v) => (v, "decrement"),
            UpdateOp::Multiply(v) => (v, "multiply"),
            UpdateOp::Divide(v) => (v, "divide"),
        };

        require_numeric(self.field, operation)?;

        if operand.as_f64().is_none() {
            return Err(ValidationError::InvalidFormat {
                field: self.field.name().to_string(),
                reason: format!("{} needs a number", operation),
            });
        }

        if self.field.kind() == ColumnKind::Int && operand.as_i64().is_none() {
            return Err(ValidationError::InvalidFormat {
                field: self.field.name().to_string(),
                reason: format!("{} of an integer column needs an integer", operation),
            });
        }

        if matches!(self.op, UpdateOp::Divide(_)) && operand.is_zero() {
            return Err(ValidationError::DivisionByZero {
                field: self.field.name().to_string(),
            });
        }

        Ok(())
    }
}

/// Appends `SET a = ?, b = b + ?, ...`.
///
/// `touch` names a timestamp column set to `now` unless the assignments
/// already set it.
pub(crate) fn push_assignments<'q, F: Column>(
    qb: &mut QueryBuilder<'q, Sqlite>,
    assignments: &[Assignment<F>],
    touch: Option<(&'static str, Value)>,
) -> Result<(), ValidationError> {
    qb.push(" SET ");
    let mut first = true;

    for assignment in assignments {
        assignment.validate()?;
        if !first {
            qb.push(", ");
        }
        first = false;

        let column = assignment.field.quoted();
        qb.push(&column).push(" = ");
        let (op, operand) = match &assignment.op {
            UpdateOp::Set(v) => {
                push_value(qb, v);
                continue;
            }
            UpdateOp::Increment(v) => ("+", v),
            UpdateOp::Decrement(v) => ("-", v),
            UpdateOp::Multiply(v) => ("*", v),
            UpdateOp::Divide(v) => ("/", v),
        };
        qb.push(&column).push(" ").push(op).push(" ");
        push_value(qb, operand);
    }

    if let Some((column, now)) = touch {
        let already_set = assignments.iter().any(|a| a.field.name() == column);
        if !already_set {
            if !first {
                qb.push(", ");
            }
            first = false;
            qb.push(format!("\"{}\" = ", column));
            push_value(qb, &now);
        }
    }

    if first {
        return Err(ValidationError::Required {
            field: "data".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::columns;

    columns! {
        enum Field {
            Status => ("status", Text),
            Stock => ("stock", Int),
            Mrp => ("mrp", Float),
            UpdatedAt => ("updatedAt", DateTime),
        }
    }

    fn render(assignments: &[Assignment<Field>], touch: bool) -> Result<String, ValidationError> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE \"T\"");
        let touch = touch.then(|| ("updatedAt", Value::DateTime(chrono::Utc::now())));
        push_assignments(&mut qb, assignments, touch)?;
        Ok(qb.sql().to_string())
    }

    #[test]
    fn test_relative_updates() {
        let sql = render(
            &[
                Assignment::set(Field::Status, "void"),
                Assignment::from_update(Field::Stock, FieldUpdate::Decrement(2i64)),
                Assignment::multiply(Field::Mrp, 1.1),
            ],
            true,
        )
        .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"T\" SET \"status\" = ?, \"stock\" = \"stock\" - ?, \"mrp\" = \"mrp\" * ?, \"updatedAt\" = ?"
        );
    }

    #[test]
    fn test_explicit_timestamp_not_duplicated() {
        let sql = render(
            &[Assignment::set(Field::UpdatedAt, chrono::Utc::now())],
            true,
        )
        .unwrap();
        assert_eq!(sql, "UPDATE \"T\" SET \"updatedAt\" = ?");
    }

    #[test]
    fn test_invalid_assignments() {
        assert!(matches!(
            render(&[Assignment::increment(Field::Status, 1)], false),
            Err(ValidationError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            render(&[Assignment::divide(Field::Stock, 0)], false),
            Err(ValidationError::DivisionByZero { .. })
        ));
        assert!(matches!(
            render(&[Assignment::increment(Field::Stock, Value::Null)], false),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(render(&[], false).is_err());
        assert!(render(&[], true).is_ok());
    }
}

//! # Update Operators
//!
//! Numeric columns can be patched relative to their stored value instead of
//! being overwritten: `set`, `increment`, `decrement`, `multiply` and
//! `divide` on `Int`/`Float` columns.
//!
//! ```text
//! { "stock": { "decrement": 3 } }   →   "stock" = "stock" - 3
//! { "mrp":   { "set": 499.0 } }     →   "mrp" = 499.0
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// An update to a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldUpdate<T> {
    /// Overwrite with the given value.
    Set(T),
    /// Add to the stored value.
    Increment(T),
    /// Subtract from the stored value.
    Decrement(T),
    /// Multiply the stored value.
    Multiply(T),
    /// Divide the stored value.
    Divide(T),
}

/// Numeric types accepted by [`FieldUpdate`].
pub trait Numeric: Copy {
    fn is_zero(&self) -> bool;
    fn is_negative(&self) -> bool;
}

impl Numeric for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn is_negative(&self) -> bool {
        *self < 0
    }
}

impl Numeric for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn is_negative(&self) -> bool {
        *self < 0.0
    }
}

impl<T: Numeric> FieldUpdate<T> {
    /// Returns the operand regardless of the operator.
    pub fn operand(&self) -> T {
        match *self {
            FieldUpdate::Set(v)
            | FieldUpdate::Increment(v)
            | FieldUpdate::Decrement(v)
            | FieldUpdate::Multiply(v)
            | FieldUpdate::Divide(v) => v,
        }
    }

    /// Rejects `Divide(0)`; SQLite would turn it into NULL.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if let FieldUpdate::Divide(v) = self {
            if v.is_zero() {
                return Err(ValidationError::DivisionByZero {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), and also rejects a negative `Set`.
    pub fn validate_non_negative(&self, field: &str) -> Result<(), ValidationError> {
        self.validate(field)?;
        if let FieldUpdate::Set(v) = self {
            if v.is_negative() {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<T> From<T> for FieldUpdate<T> {
    fn from(value: T) -> Self {
        FieldUpdate::Set(value)
    }
}

/// Deserializes a nullable patch field.
///
/// Used with `#[serde(default, deserialize_with = "double_option")]`:
/// a missing key stays `None` (leave unchanged), an explicit `null` becomes
/// `Some(None)` (clear the column).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        remarks: Option<Option<String>>,
    }

    #[test]
    fn test_field_update_json_shape() {
        let update: FieldUpdate<i64> = serde_json::from_str(r#"{"decrement":3}"#).unwrap();
        assert_eq!(update, FieldUpdate::Decrement(3));

        let json = serde_json::to_string(&FieldUpdate::Set(2.5f64)).unwrap();
        assert_eq!(json, r#"{"set":2.5}"#);
    }

    #[test]
    fn test_divide_by_zero_rejected() {
        assert!(FieldUpdate::Divide(0i64).validate("stock").is_err());
        assert!(FieldUpdate::Divide(0.0f64).validate("mrp").is_err());
        assert!(FieldUpdate::Divide(2i64).validate("stock").is_ok());
    }

    #[test]
    fn test_non_negative_only_checks_set() {
        assert!(FieldUpdate::Set(-1.0f64).validate_non_negative("mrp").is_err());
        assert!(FieldUpdate::Decrement(5i64).validate_non_negative("stock").is_ok());
    }

    #[test]
    fn test_double_option_distinguishes_null_and_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.remarks, None);

        let null: Patch = serde_json::from_str(r#"{"remarks":null}"#).unwrap();
        assert_eq!(null.remarks, Some(None));

        let set: Patch = serde_json::from_str(r#"{"remarks":"paid by UPI"}"#).unwrap();
        assert_eq!(set.remarks, Some(Some("paid by UPI".to_string())));
    }
}

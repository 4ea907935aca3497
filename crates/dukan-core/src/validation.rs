//! # Validation Module
//!
//! Input validation utilities for Dukan POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI / frontend                                               │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository (Rust)                                            │
//! │  └── THIS MODULE: format validation of every create/update input       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only shapes are checked here. Whether a discount exceeds a user's
//! `maxDiscount` or whether `grandTotal` adds up is not this module's concern.
//!
//! ## Usage
//! ```rust
//! use dukan_core::validation::{validate_sku, validate_gstin};
//!
//! assert!(validate_sku("TSHIRT-RED-M").is_ok());
//! assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field (names, labels).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `max` characters
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field: `None` passes, `Some` must satisfy
/// [`validate_text`].
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) => validate_text(field, v, max),
        None => Ok(()),
    }
}

/// Validates a login name.
///
/// ## Rules
/// - 3 to 50 characters
/// - Letters, digits, `.`, `_`, `-`
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_username;
///
/// assert!(validate_username("ravi.k").is_ok());
/// assert!(validate_username("ab").is_err());
/// assert!(validate_username("ravi kumar").is_err());
/// ```
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '.', '_' and '-'".to_string(),
        });
    }

    Ok(())
}

/// Validates a plain-text password before hashing.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }

    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_sku;
///
/// assert!(validate_sku("KURTA-BLU-XL").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_code("sku", sku, 50)
}

/// Validates a barcode (EAN-13, UPC-A, or a shop-printed code).
///
/// Same character rules as a SKU, up to 64 characters.
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    validate_code("barcode", barcode, 64)
}

fn validate_code(field: &str, code: &str, max: usize) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a phone number.
///
/// ## Rules
/// - 6 to 20 characters
/// - Digits plus `+`, spaces and `-`, with at least 6 digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let shape_ok = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'));

    if !shape_ok || digits < 6 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be at least 6 digits, optionally with '+', spaces or '-'".to_string(),
        });
    }

    Ok(())
}

/// Validates the shape of an e-mail address (`local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a GSTIN (GST identification number).
///
/// ## Format
/// ```text
///  27  AAPFU 0939 F  1  Z  V
///  ──  ───── ──── ─  ─  ─  ─
///  │   │     │    │  │  │  └── check character
///  │   │     │    │  │  └───── always 'Z'
///  │   │     │    │  └──────── entity number (1-9, A-Z)
///  │   └─────┴────┴─────────── PAN (5 letters, 4 digits, 1 letter)
///  └────────────────────────── state code (2 digits)
/// ```
/// The check character is not verified.
pub fn validate_gstin(gstin: &str) -> ValidationResult<()> {
    let gstin = gstin.trim();
    let chars: Vec<char> = gstin.chars().collect();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "gstin".to_string(),
        reason: reason.to_string(),
    };

    if chars.len() != 15 {
        return Err(invalid("must be exactly 15 characters"));
    }

    let upper_alpha = |c: &char| c.is_ascii_uppercase();
    let ok = chars[0..2].iter().all(char::is_ascii_digit)
        && chars[2..7].iter().all(upper_alpha)
        && chars[7..11].iter().all(char::is_ascii_digit)
        && upper_alpha(&chars[11])
        && (chars[12].is_ascii_uppercase() || ('1'..='9').contains(&chars[12]))
        && chars[13] == 'Z'
        && (chars[14].is_ascii_uppercase() || chars[14].is_ascii_digit());

    if !ok {
        return Err(invalid("must be state code + PAN + entity number + 'Z' + check character"));
    }

    Ok(())
}

/// Validates an HSN/SAC code: 2 to 8 digits.
pub fn validate_hsn(hsn: &str) -> ValidationResult<()> {
    let hsn = hsn.trim();

    if !(2..=8).contains(&hsn.len()) || !hsn.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "hsn".to_string(),
            reason: "must be 2 to 8 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a settings key.
///
/// ## Rules
/// - 1 to 100 characters
/// - Letters, digits, `.`, `_`, `-`
pub fn validate_setting_key(key: &str) -> ValidationResult<()> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::Required {
            field: "key".to_string(),
        });
    }

    if key.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "key".to_string(),
            max: 100,
        });
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "key".to_string(),
            reason: "must contain only letters, numbers, '.', '_' and '-'".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a float column that must not be negative (prices, amounts).
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_amount;
///
/// assert!(validate_amount("mrp", 499.0).is_ok());
/// assert!(validate_amount("mrp", 0.0).is_ok());
/// assert!(validate_amount("mrp", -1.0).is_err());
/// assert!(validate_amount("mrp", f64::NAN).is_err());
/// ```
pub fn validate_amount(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an integer column that must not be negative (minStock, width).
pub fn validate_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a sale line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates an inventory movement quantity: any non-zero value.
pub fn validate_movement_quantity(qty: i64) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: i64::MIN,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TSHIRT-RED-M").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("8901234567890").is_ok());
        assert!(validate_barcode(&"9".repeat(64)).is_ok());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("name", "Cotton Kurta", 200).is_ok());
        assert!(validate_text("name", "  ", 200).is_err());
        assert!(validate_text("name", &"क".repeat(10), 10).is_ok());
        assert!(validate_text("name", &"क".repeat(11), 10).is_err());
        assert!(validate_optional_text("remarks", None, 10).is_ok());
    }

    #[test]
    fn test_validate_username_and_password() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());

        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+91 98765-43210").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765abc10").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("billing@shop.in").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@@b.in").is_err());
        assert!(validate_email("@shop.in").is_err());
    }

    #[test]
    fn test_validate_gstin() {
        assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());
        assert!(validate_gstin("29ABCDE1234F2Z5").is_ok());

        assert!(validate_gstin("27AAPFU0939F1Z").is_err()); // 14 chars
        assert!(validate_gstin("27aapfu0939f1zv").is_err()); // lowercase
        assert!(validate_gstin("27AAPFU0939F1XV").is_err()); // no 'Z'
        assert!(validate_gstin("2XAAPFU0939F1ZV").is_err()); // state code
    }

    #[test]
    fn test_validate_hsn() {
        assert!(validate_hsn("61").is_ok());
        assert!(validate_hsn("6109").is_ok());
        assert!(validate_hsn("61091000").is_ok());
        assert!(validate_hsn("6").is_err());
        assert!(validate_hsn("610910001").is_err());
        assert!(validate_hsn("61A9").is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_amount("mrp", 0.0).is_ok());
        assert!(validate_amount("mrp", -0.5).is_err());
        assert!(validate_amount("mrp", f64::INFINITY).is_err());

        assert!(validate_count("minStock", 0).is_ok());
        assert!(validate_count("minStock", -1).is_err());

        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());

        assert!(validate_movement_quantity(-4).is_ok());
        assert!(validate_movement_quantity(0).is_err());
    }

    #[test]
    fn test_validate_setting_key() {
        assert!(validate_setting_key("store.name").is_ok());
        assert!(validate_setting_key("").is_err());
        assert!(validate_setting_key("bad key").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}

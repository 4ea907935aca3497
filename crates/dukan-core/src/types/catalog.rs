//! Catalog: categories, products and the sellable variants under them.
//!
//! ```text
//! Category "Shirts"
//!   └── Product "Cotton Formal Shirt"  (hsn 6205, taxRate 5)
//!         ├── Variant SHIRT-WHT-38  barcode 8901...01  size 38 white
//!         └── Variant SHIRT-WHT-40  barcode 8901...02  size 40 white
//! ```
//! Stock lives on the variant, not on the product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::default_true;
use crate::update::{double_option, FieldUpdate};
use crate::validation::{
    validate_amount, validate_barcode, validate_count, validate_hsn, validate_optional_text,
    validate_sku, validate_text, validate_uuid,
};

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    /// Unique display name.
    pub name: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("name", &self.name, 100)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_text("name", self.name.as_deref(), 100)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product line. Prices, codes and stock are per [`ProductVariant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,

    /// HSN classification code, when known.
    pub hsn: Option<String>,

    /// GST rate in percent. Stored only.
    pub tax_rate: f64,

    /// Soft-delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A product together with all of its variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub hsn: Option<String>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, category_id: impl Into<String>) -> Self {
        NewProduct {
            name: name.into(),
            description: None,
            category_id: category_id.into(),
            hsn: None,
            tax_rate: 0.0,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("name", &self.name, 200)?;
        validate_optional_text("description", self.description.as_deref(), 2000)?;
        validate_uuid(&self.category_id)?;
        if let Some(hsn) = &self.hsn {
            validate_hsn(hsn)?;
        }
        validate_amount("taxRate", self.tax_rate)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub hsn: Option<Option<String>>,
    pub tax_rate: Option<FieldUpdate<f64>>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_text("name", self.name.as_deref(), 200)?;
        if let Some(description) = &self.description {
            validate_optional_text("description", description.as_deref(), 2000)?;
        }
        if let Some(category_id) = &self.category_id {
            validate_uuid(category_id)?;
        }
        if let Some(Some(hsn)) = &self.hsn {
            validate_hsn(hsn)?;
        }
        if let Some(update) = &self.tax_rate {
            update.validate_non_negative("taxRate")?;
        }
        Ok(())
    }
}

// =============================================================================
// Product Variant
// =============================================================================

/// A sellable unit: one size/colour of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,

    /// Stock Keeping Unit, unique.
    pub sku: String,

    /// Printed or manufacturer barcode, unique.
    pub barcode: String,

    pub size: Option<String>,
    pub color: Option<String>,

    /// Maximum retail price printed on the tag.
    pub mrp: f64,
    pub selling_price: f64,
    pub cost_price: f64,

    /// Units on hand. May go negative; nothing here forbids it.
    pub stock: i64,

    /// Reorder threshold. Only used for listing.
    pub min_stock: i64,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    /// `"40 / White"`, `"40"`, or `None` when neither is set. Used as the
    /// `variantInfo` snapshot on sale items.
    pub fn info(&self) -> Option<String> {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => Some(format!("{} / {}", size, color)),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }

    /// True when `stock <= minStock`.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductVariant {
    pub product_id: String,
    pub sku: String,
    pub barcode: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub mrp: f64,
    pub selling_price: f64,
    #[serde(default)]
    pub cost_price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewProductVariant {
    pub fn new(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        barcode: impl Into<String>,
        mrp: f64,
        selling_price: f64,
    ) -> Self {
        NewProductVariant {
            product_id: product_id.into(),
            sku: sku.into(),
            barcode: barcode.into(),
            size: None,
            color: None,
            mrp,
            selling_price,
            cost_price: 0.0,
            stock: 0,
            min_stock: 0,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_uuid(&self.product_id)?;
        validate_sku(&self.sku)?;
        validate_barcode(&self.barcode)?;
        validate_optional_text("size", self.size.as_deref(), 50)?;
        validate_optional_text("color", self.color.as_deref(), 50)?;
        validate_amount("mrp", self.mrp)?;
        validate_amount("sellingPrice", self.selling_price)?;
        validate_amount("costPrice", self.cost_price)?;
        validate_count("minStock", self.min_stock)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductVariantUpdate {
    pub product_id: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub size: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    pub mrp: Option<FieldUpdate<f64>>,
    pub selling_price: Option<FieldUpdate<f64>>,
    pub cost_price: Option<FieldUpdate<f64>>,
    pub stock: Option<FieldUpdate<i64>>,
    pub min_stock: Option<FieldUpdate<i64>>,
    pub is_active: Option<bool>,
}

impl ProductVariantUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(product_id) = &self.product_id {
            validate_uuid(product_id)?;
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(barcode) = &self.barcode {
            validate_barcode(barcode)?;
        }
        if let Some(size) = &self.size {
            validate_optional_text("size", size.as_deref(), 50)?;
        }
        if let Some(color) = &self.color {
            validate_optional_text("color", color.as_deref(), 50)?;
        }
        for (field, update) in [
            ("mrp", &self.mrp),
            ("sellingPrice", &self.selling_price),
            ("costPrice", &self.cost_price),
        ] {
            if let Some(update) = update {
                update.validate_non_negative(field)?;
            }
        }
        if let Some(update) = &self.stock {
            update.validate("stock")?;
        }
        if let Some(update) = &self.min_stock {
            update.validate_non_negative("minStock")?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORY_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_new_product_validation() {
        let mut input = NewProduct::new("Cotton Kurta", CATEGORY_ID);
        assert!(input.validate().is_ok());

        input.hsn = Some("6109".to_string());
        assert!(input.validate().is_ok());

        input.hsn = Some("61-09".to_string());
        assert!(input.validate().is_err());

        let input = NewProduct::new("Cotton Kurta", "not-a-uuid");
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_variant_defaults_from_json() {
        let json = format!(
            r#"{{"productId":"{}","sku":"KURTA-M","barcode":"8901234567890","mrp":999,"sellingPrice":899}}"#,
            CATEGORY_ID
        );
        let input: NewProductVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(input.stock, 0);
        assert_eq!(input.min_stock, 0);
        assert_eq!(input.cost_price, 0.0);
        assert!(input.is_active);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_variant_update_rejects_negative_price_and_zero_divide() {
        let update = ProductVariantUpdate {
            mrp: Some(FieldUpdate::Set(-10.0)),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ProductVariantUpdate {
            stock: Some(FieldUpdate::Divide(0)),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ProductVariantUpdate {
            stock: Some(FieldUpdate::Decrement(3)),
            size: Some(None),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_variant_info() {
        let now = Utc::now();
        let mut variant = ProductVariant {
            id: "v1".to_string(),
            product_id: "p1".to_string(),
            sku: "SHIRT-40".to_string(),
            barcode: "8901".to_string(),
            size: Some("40".to_string()),
            color: Some("White".to_string()),
            mrp: 1299.0,
            selling_price: 1099.0,
            cost_price: 700.0,
            stock: 2,
            min_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(variant.info().as_deref(), Some("40 / White"));
        assert!(variant.is_low_stock());

        variant.color = None;
        assert_eq!(variant.info().as_deref(), Some("40"));
        variant.size = None;
        assert_eq!(variant.info(), None);
    }
}

//! Sales (bills) and their line items.
//!
//! ## Bill Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Bill #1042                         cashier: ravi                       │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  SaleItem  Cotton Kurta (M / Blue)   2 x 899.00          1798.00        │
//! │  SaleItem  Dupatta                   1 x 299.00           299.00        │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  subtotal 2097.00   discount 97.00   cgst 50.00   sgst 50.00            │
//! │  grandTotal 2100.00   paid 2500.00 (cash)   change 400.00               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Every amount is supplied by the caller and stored as given. Nothing here
//! checks that the bill adds up.
//!
//! Items snapshot the product name and variant description at the time of
//! sale, so renaming a product later does not rewrite old bills.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{Product, ProductVariant};
use crate::update::{double_option, FieldUpdate};
use crate::validation::{
    validate_amount, validate_optional_text, validate_quantity, validate_text, validate_uuid,
};
use crate::{DEFAULT_PAYMENT_METHOD, DEFAULT_SALE_STATUS};

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,

    /// Sequential bill number shown to the customer.
    pub bill_no: i64,

    /// Cashier who rang up the sale.
    pub user_id: String,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    pub subtotal: f64,
    pub discount: f64,
    pub discount_percent: f64,
    pub tax_amount: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub grand_total: f64,

    /// `cash`, `card`, `upi`, ... Free text.
    pub payment_method: String,
    pub paid_amount: f64,
    pub change_amount: f64,

    /// `completed`, `void`, ... Free text.
    pub status: String,
    pub remarks: Option<String>,

    /// Imported from another system rather than billed here.
    pub is_historical: bool,
    pub imported_from: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub variant_id: String,

    /// Product name at time of sale.
    pub product_name: String,

    /// Size/colour description at time of sale.
    pub variant_info: Option<String>,

    pub quantity: i64,
    pub mrp: f64,
    pub selling_price: f64,
    pub discount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale with its items, as created in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Inputs
// =============================================================================

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_string()
}

fn default_status() -> String {
    DEFAULT_SALE_STATUS.to_string()
}

/// Input for creating a sale together with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    /// Allocated as `MAX(billNo) + 1` when absent.
    #[serde(default)]
    pub bill_no: Option<i64>,
    pub user_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub cgst: f64,
    #[serde(default)]
    pub sgst: f64,
    #[serde(default)]
    pub grand_total: f64,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub change_amount: f64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub is_historical: bool,
    #[serde(default)]
    pub imported_from: Option<String>,
    /// Backdates an imported sale. Defaults to now.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<NewSaleItem>,
}

impl NewSale {
    /// An empty cash sale by `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        NewSale {
            bill_no: None,
            user_id: user_id.into(),
            customer_name: None,
            customer_phone: None,
            subtotal: 0.0,
            discount: 0.0,
            discount_percent: 0.0,
            tax_amount: 0.0,
            cgst: 0.0,
            sgst: 0.0,
            grand_total: 0.0,
            payment_method: default_payment_method(),
            paid_amount: 0.0,
            change_amount: 0.0,
            status: default_status(),
            remarks: None,
            is_historical: false,
            imported_from: None,
            created_at: None,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: NewSaleItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_uuid(&self.user_id)?;
        if let Some(bill_no) = self.bill_no {
            if bill_no <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "billNo".to_string(),
                });
            }
        }
        validate_optional_text("customerName", self.customer_name.as_deref(), 200)?;
        validate_optional_text("customerPhone", self.customer_phone.as_deref(), 20)?;
        for (field, value) in [
            ("subtotal", self.subtotal),
            ("discount", self.discount),
            ("discountPercent", self.discount_percent),
            ("taxAmount", self.tax_amount),
            ("cgst", self.cgst),
            ("sgst", self.sgst),
            ("grandTotal", self.grand_total),
            ("paidAmount", self.paid_amount),
            ("changeAmount", self.change_amount),
        ] {
            validate_amount(field, value)?;
        }
        validate_text("paymentMethod", &self.payment_method, 50)?;
        validate_text("status", &self.status, 50)?;
        validate_optional_text("remarks", self.remarks.as_deref(), 1000)?;
        validate_optional_text("importedFrom", self.imported_from.as_deref(), 200)?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// One line of a [`NewSale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub variant_id: String,
    pub product_name: String,
    #[serde(default)]
    pub variant_info: Option<String>,
    pub quantity: i64,
    pub mrp: f64,
    pub selling_price: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub tax_amount: f64,
    pub total: f64,
}

impl NewSaleItem {
    /// Snapshots name, variant info, prices and tax rate from the catalog.
    /// `total` is whatever the till computed.
    pub fn from_variant(
        product: &Product,
        variant: &ProductVariant,
        quantity: i64,
        total: f64,
    ) -> Self {
        NewSaleItem {
            variant_id: variant.id.clone(),
            product_name: product.name.clone(),
            variant_info: variant.info(),
            quantity,
            mrp: variant.mrp,
            selling_price: variant.selling_price,
            discount: 0.0,
            tax_rate: product.tax_rate,
            tax_amount: 0.0,
            total,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_uuid(&self.variant_id)?;
        validate_text("productName", &self.product_name, 200)?;
        validate_optional_text("variantInfo", self.variant_info.as_deref(), 200)?;
        validate_quantity(self.quantity)?;
        for (field, value) in [
            ("mrp", self.mrp),
            ("sellingPrice", self.selling_price),
            ("discount", self.discount),
            ("taxRate", self.tax_rate),
            ("taxAmount", self.tax_amount),
            ("total", self.total),
        ] {
            validate_amount(field, value)?;
        }
        Ok(())
    }
}

/// Patch for a sale header. Items are not patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleUpdate {
    pub bill_no: Option<i64>,
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_phone: Option<Option<String>>,
    pub subtotal: Option<FieldUpdate<f64>>,
    pub discount: Option<FieldUpdate<f64>>,
    pub discount_percent: Option<FieldUpdate<f64>>,
    pub tax_amount: Option<FieldUpdate<f64>>,
    pub cgst: Option<FieldUpdate<f64>>,
    pub sgst: Option<FieldUpdate<f64>>,
    pub grand_total: Option<FieldUpdate<f64>>,
    pub payment_method: Option<String>,
    pub paid_amount: Option<FieldUpdate<f64>>,
    pub change_amount: Option<FieldUpdate<f64>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub remarks: Option<Option<String>>,
    pub is_historical: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub imported_from: Option<Option<String>>,
}

impl SaleUpdate {
    /// Sets `status`, e.g. `"void"`.
    pub fn status(status: impl Into<String>) -> Self {
        SaleUpdate {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(bill_no) = self.bill_no {
            if bill_no <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "billNo".to_string(),
                });
            }
        }
        if let Some(user_id) = &self.user_id {
            validate_uuid(user_id)?;
        }
        for (field, update) in [
            ("subtotal", &self.subtotal),
            ("discount", &self.discount),
            ("discountPercent", &self.discount_percent),
            ("taxAmount", &self.tax_amount),
            ("cgst", &self.cgst),
            ("sgst", &self.sgst),
            ("grandTotal", &self.grand_total),
            ("paidAmount", &self.paid_amount),
            ("changeAmount", &self.change_amount),
        ] {
            if let Some(update) = update {
                update.validate_non_negative(field)?;
            }
        }
        validate_optional_text("paymentMethod", self.payment_method.as_deref(), 50)?;
        validate_optional_text("status", self.status.as_deref(), 50)?;
        if let Some(remarks) = &self.remarks {
            validate_optional_text("remarks", remarks.as_deref(), 1000)?;
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

    const USER_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
    const VARIANT_ID: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

    fn item(quantity: i64) -> NewSaleItem {
        NewSaleItem {
            variant_id: VARIANT_ID.to_string(),
            product_name: "Cotton Kurta".to_string(),
            variant_info: Some("M / Blue".to_string()),
            quantity,
            mrp: 999.0,
            selling_price: 899.0,
            discount: 0.0,
            tax_rate: 5.0,
            tax_amount: 0.0,
            total: 899.0 * quantity as f64,
        }
    }

    #[test]
    fn test_new_sale_defaults_from_json() {
        let json = format!(r#"{{"userId":"{}","grandTotal":100.5}}"#, USER_ID);
        let sale: NewSale = serde_json::from_str(&json).unwrap();
        assert_eq!(sale.payment_method, "cash");
        assert_eq!(sale.status, "completed");
        assert_eq!(sale.bill_no, None);
        assert!(!sale.is_historical);
        assert!(sale.items.is_empty());
        assert!(sale.validate().is_ok());
    }

    #[test]
    fn test_amounts_are_not_cross_checked() {
        // grandTotal unrelated to subtotal is fine
        let mut sale = NewSale::new(USER_ID).with_item(item(2));
        sale.subtotal = 10.0;
        sale.grand_total = 99999.0;
        assert!(sale.validate().is_ok());
    }

    #[test]
    fn test_item_quantity_must_be_positive() {
        let sale = NewSale::new(USER_ID).with_item(item(0));
        assert!(sale.validate().is_err());
    }

    #[test]
    fn test_bill_no_must_be_positive() {
        let mut sale = NewSale::new(USER_ID);
        sale.bill_no = Some(0);
        assert!(sale.validate().is_err());
        assert!(SaleUpdate {
            bill_no: Some(-3),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_status_patch() {
        let update = SaleUpdate::status("void");
        assert_eq!(update.status.as_deref(), Some("void"));
        assert!(update.validate().is_ok());
    }
}

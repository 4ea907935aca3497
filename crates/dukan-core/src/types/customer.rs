//! Customers. Not linked to sales by key; a sale snapshots the name and
//! phone it was billed to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::update::double_option;
use crate::validation::{
    validate_email, validate_gstin, validate_optional_text, validate_phone, validate_text,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,

    /// Unique when present.
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,

    /// GST identification number for B2B invoices.
    pub gstin: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        NewCustomer {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("name", &self.name, 200)?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        validate_optional_text("address", self.address.as_deref(), 500)?;
        if let Some(gstin) = &self.gstin {
            validate_gstin(gstin)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub gstin: Option<Option<String>>,
}

impl CustomerUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_text("name", self.name.as_deref(), 200)?;
        if let Some(Some(phone)) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(Some(email)) = &self.email {
            validate_email(email)?;
        }
        if let Some(address) = &self.address {
            validate_optional_text("address", address.as_deref(), 500)?;
        }
        if let Some(Some(gstin)) = &self.gstin {
            validate_gstin(gstin)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_customer_validation() {
        assert!(NewCustomer::new("Meena Traders")
            .with_phone("+91 98200 12345")
            .validate()
            .is_ok());

        let mut input = NewCustomer::new("Meena Traders");
        input.gstin = Some("27AAPFU0939F1ZV".to_string());
        assert!(input.validate().is_ok());

        input.gstin = Some("bogus".to_string());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_clearing_fields_skips_format_checks() {
        let update: CustomerUpdate =
            serde_json::from_str(r#"{"phone":null,"gstin":null}"#).unwrap();
        assert_eq!(update.phone, Some(None));
        assert_eq!(update.gstin, Some(None));
        assert_eq!(update.email, None);
        assert!(update.validate().is_ok());
    }
}

//! Inventory movements: an append-only ledger of stock changes per variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{
    validate_movement_quantity, validate_optional_text, validate_text, validate_uuid,
};

/// One stock change.
///
/// `movement_type` is free text (`purchase`, `sale`, `adjustment`,
/// `return`, ...). The sign convention of `quantity` belongs to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: String,
    pub variant_id: String,

    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub movement_type: String,

    pub quantity: i64,
    pub reason: Option<String>,

    /// Bill number, purchase order, ... that caused the movement.
    pub reference: Option<String>,

    /// Username or id of whoever recorded it.
    pub created_by: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryMovement {
    pub variant_id: String,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub created_by: String,
}

impl NewInventoryMovement {
    pub fn new(
        variant_id: impl Into<String>,
        movement_type: impl Into<String>,
        quantity: i64,
        created_by: impl Into<String>,
    ) -> Self {
        NewInventoryMovement {
            variant_id: variant_id.into(),
            movement_type: movement_type.into(),
            quantity,
            reason: None,
            reference: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_uuid(&self.variant_id)?;
        validate_text("type", &self.movement_type, 50)?;
        validate_movement_quantity(self.quantity)?;
        validate_optional_text("reason", self.reason.as_deref(), 500)?;
        validate_optional_text("reference", self.reference.as_deref(), 200)?;
        validate_text("createdBy", &self.created_by, 100)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_is_named_type_on_the_wire() {
        let input: NewInventoryMovement = serde_json::from_str(
            r#"{"variantId":"550e8400-e29b-41d4-a716-446655440000","type":"purchase","quantity":12,"createdBy":"admin"}"#,
        )
        .unwrap();
        assert_eq!(input.movement_type, "purchase");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let input = NewInventoryMovement::new(
            "550e8400-e29b-41d4-a716-446655440000",
            "adjustment",
            0,
            "admin",
        );
        assert!(input.validate().is_err());
    }
}

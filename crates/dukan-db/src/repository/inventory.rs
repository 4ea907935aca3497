//! # Inventory Movement Repository
//!
//! Append-only ledger of stock changes.
//!
//! ```text
//! record(movement)                       ledger row only
//! record_with_stock_delta(movement, d)   ledger row + "stock" = "stock" + d,
//!                                        one transaction
//! ```
//!
//! The ledger and `ProductVariant.stock` are independent columns; nothing
//! reconciles them. Callers that want both to move use
//! [`record_with_stock_delta`](Repository::record_with_stock_delta).

use chrono::Utc;
use tracing::info;

use dukan_core::{new_id, InventoryMovement, NewInventoryMovement, ProductVariant, ValidationError};

use super::{Insertable, Repository};
use crate::error::DbResult;
use crate::ops;
use crate::query::{Aggregate, Assignment, Filter, FindMany, OrderBy};
use crate::schema::{InventoryMovementField, ProductVariantField};

impl Insertable for NewInventoryMovement {
    type Row = InventoryMovement;

    fn validate(&self) -> Result<(), ValidationError> {
        NewInventoryMovement::validate(self)
    }

    fn into_row(self) -> DbResult<InventoryMovement> {
        Ok(InventoryMovement {
            id: new_id(),
            variant_id: self.variant_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            reason: self.reason,
            reference: self.reference,
            created_by: self.created_by,
            created_at: Utc::now(),
        })
    }
}

impl<'c> Repository<'c, InventoryMovement> {
    /// Appends a movement without touching stock.
    pub async fn record(&mut self, movement: NewInventoryMovement) -> DbResult<InventoryMovement> {
        self.create(movement).await
    }

    /// Appends a movement and adds `delta` to the variant's stock in the
    /// same transaction.
    pub async fn record_with_stock_delta(
        &mut self,
        movement: NewInventoryMovement,
        delta: i64,
    ) -> DbResult<(InventoryMovement, ProductVariant)> {
        movement.validate()?;
        let row = movement.into_row()?;

        let capture = self.captures();
        let mut conn = self.writer().await?;

        let movement = ops::insert(&mut conn, &row, capture).await?;
        let variant = ops::update_fields::<ProductVariant>(
            &mut conn,
            &movement.variant_id,
            &[Assignment::increment(ProductVariantField::Stock, delta)],
            capture,
        )
        .await?;

        conn.commit().await?;

        info!(
            variant_id = %variant.id,
            movement_type = %movement.movement_type,
            delta,
            stock = variant.stock,
            "Stock movement recorded"
        );
        Ok((movement, variant))
    }

    /// Movements of one variant, newest first.
    pub async fn history(&mut self, variant_id: &str, limit: i64) -> DbResult<Vec<InventoryMovement>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(InventoryMovementField::VariantId, variant_id))
                .order_by(OrderBy::desc(InventoryMovementField::CreatedAt))
                .take(limit),
        )
        .await
    }

    /// Net quantity recorded in the ledger for a variant.
    pub async fn net_quantity(&mut self, variant_id: &str) -> DbResult<i64> {
        let result = self
            .aggregate(
                Aggregate::new()
                    .filter(Filter::eq(InventoryMovementField::VariantId, variant_id))
                    .sum(InventoryMovementField::Quantity),
            )
            .await?;
        Ok(result
            .sum_of(InventoryMovementField::Quantity)
            .map(|sum| sum as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::NewInventoryMovement;

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_record_leaves_stock_alone() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let variant = fixtures::variant(&db, &product, "K-M", "1002").await;

        db.inventory()
            .record(NewInventoryMovement::new(&variant.id, "adjustment", -1, "admin"))
            .await
            .unwrap();

        assert_eq!(db.variants().get(&variant.id).await.unwrap().stock, 10);
        assert_eq!(db.inventory().net_quantity(&variant.id).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_record_with_stock_delta() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let variant = fixtures::variant(&db, &product, "K-M", "1002").await;

        let (movement, updated) = db
            .inventory()
            .record_with_stock_delta(
                NewInventoryMovement::new(&variant.id, "purchase", 12, "admin")
                    .with_reference("PO-17"),
                12,
            )
            .await
            .unwrap();
        assert_eq!(movement.reference.as_deref(), Some("PO-17"));
        assert_eq!(updated.stock, 22);

        let history = db.inventory().history(&variant.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement_type, "purchase");
    }

    #[tokio::test]
    async fn test_unknown_variant_rolls_back() {
        let db = fixtures::db().await;
        let err = db
            .inventory()
            .record_with_stock_delta(
                NewInventoryMovement::new(dukan_core::new_id(), "purchase", 1, "admin"),
                1,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("P2003"));
        assert_eq!(db.inventory().count(None).await.unwrap(), 0);
    }
}

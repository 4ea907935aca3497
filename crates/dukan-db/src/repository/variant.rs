//! # Product Variant Repository
//!
//! The sellable units: codes, prices and stock.
//!
//! ## Till Lookup
//! ```text
//! scanner / keyboard ──► lookup("8901234567890")
//!                           │
//!                           ▼
//!        ("sku" = ? OR "barcode" = ?) AND "isActive" = 1
//! ```
//!
//! Stock changes go through [`adjust_stock`](Repository::adjust_stock), a
//! single `"stock" = "stock" + ?` statement, so concurrent tills never lose
//! an update. Nothing prevents stock from going negative.

use chrono::Utc;
use tracing::debug;

use dukan_core::{new_id, NewProductVariant, ProductVariant, ProductVariantUpdate, ValidationError};

use super::{Insertable, Patch, Repository};
use crate::error::DbResult;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::ProductVariantField as Field;

impl Insertable for NewProductVariant {
    type Row = ProductVariant;

    fn validate(&self) -> Result<(), ValidationError> {
        NewProductVariant::validate(self)
    }

    fn into_row(self) -> DbResult<ProductVariant> {
        let now = Utc::now();
        Ok(ProductVariant {
            id: new_id(),
            product_id: self.product_id,
            sku: self.sku.trim().to_string(),
            barcode: self.barcode.trim().to_string(),
            size: self.size,
            color: self.color,
            mrp: self.mrp,
            selling_price: self.selling_price,
            cost_price: self.cost_price,
            stock: self.stock,
            min_stock: self.min_stock,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Patch for ProductVariantUpdate {
    type Row = ProductVariant;

    fn validate(&self) -> Result<(), ValidationError> {
        ProductVariantUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<Field>> {
        let mut out = Vec::new();
        if let Some(product_id) = self.product_id {
            out.push(Assignment::set(Field::ProductId, product_id));
        }
        if let Some(sku) = self.sku {
            out.push(Assignment::set(Field::Sku, sku.trim()));
        }
        if let Some(barcode) = self.barcode {
            out.push(Assignment::set(Field::Barcode, barcode.trim()));
        }
        if let Some(size) = self.size {
            out.push(Assignment::set(Field::Size, size));
        }
        if let Some(color) = self.color {
            out.push(Assignment::set(Field::Color, color));
        }
        for (field, update) in [
            (Field::Mrp, self.mrp),
            (Field::SellingPrice, self.selling_price),
            (Field::CostPrice, self.cost_price),
        ] {
            if let Some(update) = update {
                out.push(Assignment::from_update(field, update));
            }
        }
        for (field, update) in [(Field::Stock, self.stock), (Field::MinStock, self.min_stock)] {
            if let Some(update) = update {
                out.push(Assignment::from_update(field, update));
            }
        }
        if let Some(is_active) = self.is_active {
            out.push(Assignment::set(Field::IsActive, is_active));
        }
        out
    }
}

impl<'c> Repository<'c, ProductVariant> {
    pub async fn get_by_sku(&mut self, sku: &str) -> DbResult<Option<ProductVariant>> {
        self.find_first(FindMany::from(Filter::eq(Field::Sku, sku.trim())))
            .await
    }

    pub async fn get_by_barcode(&mut self, barcode: &str) -> DbResult<Option<ProductVariant>> {
        self.find_first(FindMany::from(Filter::eq(Field::Barcode, barcode.trim())))
            .await
    }

    /// Finds an active variant by barcode, falling back to SKU. A code that
    /// is one variant's barcode and another's SKU resolves to the barcode.
    pub async fn lookup(&mut self, code: &str) -> DbResult<Option<ProductVariant>> {
        let code = code.trim();
        debug!(code, "Looking up variant");
        for field in [Field::Barcode, Field::Sku] {
            let found = self
                .find_first(FindMany::from(
                    Filter::eq(field, code).and(Filter::eq(Field::IsActive, true)),
                ))
                .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Adds `delta` (negative to remove) to the stored stock.
    pub async fn adjust_stock(&mut self, id: &str, delta: i64) -> DbResult<ProductVariant> {
        debug!(id, delta, "Adjusting stock");
        self.update_fields(id, &[Assignment::increment(Field::Stock, delta)])
            .await
    }

    /// Active variants at or below their reorder threshold, lowest stock
    /// first.
    pub async fn low_stock(&mut self) -> DbResult<Vec<ProductVariant>> {
        let mut conn = self.reader().await?;
        let rows = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM "ProductVariant"
            WHERE "isActive" = 1 AND "stock" <= "minStock"
            ORDER BY "stock" ASC, "sku" ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_product(&mut self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(Field::ProductId, product_id))
                .order_by(OrderBy::asc(Field::Sku)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{FieldUpdate, ProductVariantUpdate};

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_lookup_by_sku_or_barcode() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let variant = fixtures::variant(&db, &product, "K-M", "8901234567890").await;

        let by_sku = db.variants().lookup("K-M").await.unwrap().unwrap();
        let by_barcode = db.variants().lookup(" 8901234567890 ").await.unwrap().unwrap();
        assert_eq!(by_sku.id, variant.id);
        assert_eq!(by_barcode.id, variant.id);
        assert!(db.variants().lookup("nope").await.unwrap().is_none());

        db.variants()
            .update(
                &variant.id,
                ProductVariantUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(db.variants().lookup("K-M").await.unwrap().is_none());
        assert!(db.variants().get_by_sku("K-M").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lookup_prefers_barcode_over_sku() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let by_sku = fixtures::variant(&db, &product, "2002", "8900000000001").await;
        let by_barcode = fixtures::variant(&db, &product, "K-L", "2002").await;

        for _ in 0..3 {
            let found = db.variants().lookup("2002").await.unwrap().unwrap();
            assert_eq!(found.id, by_barcode.id);
        }
        assert_eq!(db.variants().lookup("8900000000001").await.unwrap().unwrap().id, by_sku.id);
    }

    #[tokio::test]
    async fn test_adjust_stock_may_go_negative() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let variant = fixtures::variant(&db, &product, "K-M", "1002").await;

        let v = db.variants().adjust_stock(&variant.id, -4).await.unwrap();
        assert_eq!(v.stock, 6);
        let v = db.variants().adjust_stock(&variant.id, -10).await.unwrap();
        assert_eq!(v.stock, -4);
        assert!(db.variants().adjust_stock("missing", 1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let a = fixtures::variant(&db, &product, "K-S", "1001").await;
        fixtures::variant(&db, &product, "K-M", "1002").await;

        assert!(db.variants().low_stock().await.unwrap().is_empty());

        db.variants()
            .update(
                &a.id,
                ProductVariantUpdate {
                    stock: Some(FieldUpdate::Set(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let low = db.variants().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "K-S");
        assert!(low[0].is_low_stock());
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        fixtures::variant(&db, &product, "K-S", "1001").await;

        let err = db
            .variants()
            .create(dukan_core::NewProductVariant::new(&product.id, "K-X", "1001", 1.0, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unique constraint failed on barcode");
    }
}

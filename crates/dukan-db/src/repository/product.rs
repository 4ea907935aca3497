//! # Product Repository
//!
//! Product lines. Codes, prices and stock live on the variants
//! (see [`variant`](super::variant)).
//!
//! ## Search
//! ```text
//! search("kurta", 20)
//!     │
//!     ├── ""        → active products by name
//!     └── "kurta"   → "name" LIKE '%kurta%' (ASCII case-insensitive)
//!                     AND "isActive" = 1, by name
//! ```

use chrono::Utc;
use tracing::debug;

use dukan_core::validation::validate_search_query;
use dukan_core::{
    new_id, NewProduct, Product, ProductUpdate, ProductVariant, ProductWithVariants,
    ValidationError,
};

use super::{Insertable, Patch, Repository};
use crate::error::DbResult;
use crate::ops;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::{ProductField, ProductVariantField};

impl Insertable for NewProduct {
    type Row = Product;

    fn validate(&self) -> Result<(), ValidationError> {
        NewProduct::validate(self)
    }

    fn into_row(self) -> DbResult<Product> {
        let now = Utc::now();
        Ok(Product {
            id: new_id(),
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            hsn: self.hsn,
            tax_rate: self.tax_rate,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Patch for ProductUpdate {
    type Row = Product;

    fn validate(&self) -> Result<(), ValidationError> {
        ProductUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<ProductField>> {
        let mut out = Vec::new();
        if let Some(name) = self.name {
            out.push(Assignment::set(ProductField::Name, name));
        }
        if let Some(description) = self.description {
            out.push(Assignment::set(ProductField::Description, description));
        }
        if let Some(category_id) = self.category_id {
            out.push(Assignment::set(ProductField::CategoryId, category_id));
        }
        if let Some(hsn) = self.hsn {
            out.push(Assignment::set(ProductField::Hsn, hsn));
        }
        if let Some(update) = self.tax_rate {
            out.push(Assignment::from_update(ProductField::TaxRate, update));
        }
        if let Some(is_active) = self.is_active {
            out.push(Assignment::set(ProductField::IsActive, is_active));
        }
        out
    }
}

impl<'c> Repository<'c, Product> {
    /// Loads a product with all of its variants, active or not, ordered by SKU.
    pub async fn get_with_variants(&mut self, id: &str) -> DbResult<Option<ProductWithVariants>> {
        let mut conn = self.reader().await?;

        let Some(product) = ops::find_unique::<Product>(&mut conn, id).await? else {
            return Ok(None);
        };

        let variants = ops::find_many::<ProductVariant>(
            &mut conn,
            &FindMany::new()
                .filter(Filter::eq(ProductVariantField::ProductId, id))
                .order_by(OrderBy::asc(ProductVariantField::Sku)),
        )
        .await?;

        Ok(Some(ProductWithVariants { product, variants }))
    }

    /// Active products whose name contains `query`.
    pub async fn search(&mut self, query: &str, limit: i64) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        debug!(query = %query, limit, "Searching products");

        let mut args = FindMany::new()
            .filter(Filter::eq(ProductField::IsActive, true))
            .order_by(OrderBy::asc(ProductField::Name))
            .take(limit);
        if !query.is_empty() {
            args = args.filter(Filter::contains(ProductField::Name, query));
        }

        let products = self.find_many(args).await?;
        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn list_by_category(&mut self, category_id: &str) -> DbResult<Vec<Product>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(ProductField::CategoryId, category_id))
                .order_by(OrderBy::asc(ProductField::Name)),
        )
        .await
    }

    /// Soft delete: the row stays so past sale items keep their reference.
    pub async fn deactivate(&mut self, id: &str) -> DbResult<Product> {
        debug!(id, "Soft-deleting product");
        self.update_fields(id, &[Assignment::set(ProductField::IsActive, false)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::ProductUpdate;

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_get_with_variants() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        fixtures::variant(&db, &product, "K-L", "1003").await;
        fixtures::variant(&db, &product, "K-M", "1002").await;

        let loaded = db.products().get_with_variants(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.product.id, product.id);
        let skus: Vec<_> = loaded.variants.iter().map(|v| v.sku.as_str()).collect();
        assert_eq!(skus, ["K-L", "K-M"]);

        assert!(db.products().get_with_variants("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_skips_inactive() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;

        assert_eq!(db.products().search("KURTA", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("", 10).await.unwrap().len(), 1);
        assert!(db.products().search("saree", 10).await.unwrap().is_empty());

        db.products().deactivate(&product.id).await.unwrap();
        assert!(db.products().search("kurta", 10).await.unwrap().is_empty());
        assert_eq!(db.products().list_by_category(&product.category_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_clears_nullable_fields() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;

        let updated = db
            .products()
            .update(
                &product.id,
                ProductUpdate {
                    hsn: Some(Some("6109".to_string())),
                    description: Some(Some("Hand block print".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.hsn.as_deref(), Some("6109"));

        let updated = db
            .products()
            .update(
                &product.id,
                ProductUpdate {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.hsn.as_deref(), Some("6109"));
    }
}

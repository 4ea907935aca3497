//! Category repository.

use chrono::Utc;
use tracing::debug;

use dukan_core::validation::validate_text;
use dukan_core::{new_id, Category, CategoryUpdate, CategoryWithCount, NewCategory, ValidationError};

use super::{Insertable, Patch, Repository};
use crate::error::DbResult;
use crate::query::{Assignment, Filter, FindMany};
use crate::schema::CategoryField;

impl Insertable for NewCategory {
    type Row = Category;

    fn validate(&self) -> Result<(), ValidationError> {
        NewCategory::validate(self)
    }

    fn into_row(self) -> DbResult<Category> {
        let now = Utc::now();
        Ok(Category {
            id: new_id(),
            name: self.name.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl Patch for CategoryUpdate {
    type Row = Category;

    fn validate(&self) -> Result<(), ValidationError> {
        CategoryUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<CategoryField>> {
        self.name
            .map(|name| Assignment::set(CategoryField::Name, name.trim().to_string()))
            .into_iter()
            .collect()
    }
}

impl<'c> Repository<'c, Category> {
    pub async fn get_by_name(&mut self, name: &str) -> DbResult<Option<Category>> {
        self.find_first(FindMany::from(Filter::eq(CategoryField::Name, name.trim())))
            .await
    }

    pub async fn rename(&mut self, id: &str, name: &str) -> DbResult<Category> {
        validate_text("name", name, 100)?;
        debug!(id, name, "Renaming category");
        self.update_fields(id, &[Assignment::set(CategoryField::Name, name.trim())])
            .await
    }

    /// Every category with its product count, by name. Empty categories
    /// count zero.
    pub async fn list_with_product_counts(&mut self) -> DbResult<Vec<CategoryWithCount>> {
        let mut conn = self.reader().await?;
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.*, COUNT(p."id") AS "productCount"
            FROM "Category" c
            LEFT JOIN "Product" p ON p."categoryId" = c."id"
            GROUP BY c."id"
            ORDER BY c."name" ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{NewCategory, NewProduct};

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_rename_and_lookup() {
        let db = fixtures::db().await;
        let category = db.categories().create(NewCategory::new(" Sarees ")).await.unwrap();
        assert_eq!(category.name, "Sarees");

        db.categories().rename(&category.id, "Silk Sarees").await.unwrap();
        assert!(db.categories().get_by_name("Sarees").await.unwrap().is_none());
        let found = db.categories().get_by_name("Silk Sarees").await.unwrap().unwrap();
        assert_eq!(found.id, category.id);

        let err = db.categories().create(NewCategory::new("Silk Sarees")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_product_counts_include_empty_categories() {
        let db = fixtures::db().await;
        let kurtas = db.categories().create(NewCategory::new("Kurtas")).await.unwrap();
        db.categories().create(NewCategory::new("Belts")).await.unwrap();
        for name in ["Cotton Kurta", "Linen Kurta"] {
            db.products()
                .create(NewProduct::new(name, &kurtas.id))
                .await
                .unwrap();
        }

        let counts = db.categories().list_with_product_counts().await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].category.name, "Belts");
        assert_eq!(counts[0].product_count, 0);
        assert_eq!(counts[1].product_count, 2);
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db).await;
        let err = db.categories().delete(&product.category_id).await.unwrap_err();
        assert_eq!(err.code(), Some("P2003"));
    }
}

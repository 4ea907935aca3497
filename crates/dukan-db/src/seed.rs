//! # Demo Data
//!
//! Populates an empty database with a small clothing-store catalog, an
//! admin account and default settings. Used by the `seed` binary and
//! `dukan seed`.
//!
//! ## Generated Data
//! ```text
//! User      admin (every permission)
//! Category  Kurtas, Sarees, Shirts, Jeans, Dupattas, ...   (--categories N)
//! Product   3 per category
//! Variant   S / M / L / XL per product
//!           sku     {CAT}-{PRODUCT}-{SIZE}     e.g. KUR-01-M
//!           barcode 890{category}{product}{size}, 13 digits
//! Setting   store.name, receipt.footer
//! Printer   receipt (80 mm)
//! ```
//!
//! Seeding is skipped when any variant exists.

use serde::Serialize;
use tracing::info;

use dukan_core::{
    NewCategory, NewPrinterConfig, NewProduct, NewProductVariant, NewUser, PermissionSet,
};

use crate::error::DbResult;
use crate::pool::Database;

const CATALOG: &[(&str, &str, &[&str])] = &[
    ("KUR", "Kurtas", &["Cotton Kurta", "Linen Kurta", "Chikan Kurta"]),
    ("SAR", "Sarees", &["Banarasi Silk Saree", "Cotton Saree", "Georgette Saree"]),
    ("SHI", "Shirts", &["Oxford Shirt", "Linen Shirt", "Printed Shirt"]),
    ("JEA", "Jeans", &["Slim Fit Jeans", "Straight Jeans", "Relaxed Jeans"]),
    ("DUP", "Dupattas", &["Phulkari Dupatta", "Chiffon Dupatta", "Bandhani Dupatta"]),
    ("KID", "Kidswear", &["Kids Kurta Set", "Frock", "Dungaree"]),
];

/// Size and the amount added to the base price.
const SIZES: &[(&str, f64)] = &[("S", 0.0), ("M", 0.0), ("L", 50.0), ("XL", 100.0)];

/// Tax rates (percent) cycled across products.
const TAX_RATES: &[f64] = &[5.0, 12.0];

#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// How many categories of the built-in catalog to create.
    pub categories: usize,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            categories: CATALOG.len(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub skipped: bool,
    pub users: usize,
    pub categories: usize,
    pub products: usize,
    pub variants: usize,
}

/// Number of categories in the built-in catalog.
pub fn catalog_size() -> usize {
    CATALOG.len()
}

pub async fn seed_demo_data(db: &Database, options: &SeedOptions) -> DbResult<SeedReport> {
    let existing = db.variants().count(None).await?;
    if existing > 0 {
        info!(existing, "Database already has variants, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..Default::default()
        });
    }

    let mut report = SeedReport::default();

    if db.users().get_by_username(&options.admin_username).await?.is_none() {
        db.users()
            .create(
                NewUser::new(&options.admin_username, &options.admin_password, "Administrator")
                    .with_role("admin")
                    .with_permissions(PermissionSet::full()),
            )
            .await?;
        report.users += 1;
    }

    for (category_idx, (code, name, products)) in
        CATALOG.iter().take(options.categories).enumerate()
    {
        let category = match db.categories().get_by_name(name).await? {
            Some(category) => category,
            None => {
                report.categories += 1;
                db.categories().create(NewCategory::new(*name)).await?
            }
        };

        for (product_idx, product_name) in products.iter().enumerate() {
            let seed = category_idx * 10 + product_idx;

            let mut input = NewProduct::new(*product_name, &category.id);
            input.hsn = Some(if *code == "SAR" { "5007" } else { "6211" }.to_string());
            input.tax_rate = TAX_RATES[seed % TAX_RATES.len()];
            let product = db.products().create(input).await?;
            report.products += 1;

            let base_price = 399.0 + ((seed * 137) % 1600) as f64;

            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                let selling_price = base_price + addon;
                let mut variant = NewProductVariant::new(
                    &product.id,
                    format!("{}-{:02}-{}", code, product_idx + 1, size),
                    format!("890{:02}{:02}{:06}", category_idx, product_idx, size_idx),
                    (selling_price * 1.2).round(),
                    selling_price,
                );
                variant.size = Some(size.to_string());
                variant.cost_price = (selling_price * 0.6).round();
                variant.stock = ((seed + size_idx * 7) % 25) as i64;
                variant.min_stock = 3;
                db.variants().create(variant).await?;
                report.variants += 1;
            }
        }
    }

    if db.settings().get_value("store.name").await?.is_none() {
        db.settings().set("store.name", "Dukan Demo Store").await?;
    }
    if db.settings().get_value("receipt.footer").await?.is_none() {
        db.settings()
            .set("receipt.footer", "Thank you for shopping with us")
            .await?;
    }
    if db.printers().get_by_type("receipt").await?.is_none() {
        db.printers()
            .configure(NewPrinterConfig::new("receipt", "Default Receipt Printer"))
            .await?;
    }

    info!(
        categories = report.categories,
        products = report.products,
        variants = report.variants,
        "Seed complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory().capture_changes(false))
            .await
            .unwrap();
        let options = SeedOptions {
            categories: 2,
            ..Default::default()
        };

        let report = seed_demo_data(&db, &options).await.unwrap();
        assert_eq!(report.categories, 2);
        assert_eq!(report.products, 6);
        assert_eq!(report.variants, 24);

        let again = seed_demo_data(&db, &options).await.unwrap();
        assert!(again.skipped);
        assert_eq!(db.variants().count(None).await.unwrap(), 24);

        let admin = db
            .users()
            .authenticate("admin", "admin123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.permissions(), PermissionSet::full());
        assert!(db.variants().lookup("KUR-01-M").await.unwrap().is_some());
    }
}

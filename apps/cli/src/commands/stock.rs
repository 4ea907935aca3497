//! `lookup` and `stock low|adjust`.

use anyhow::{Context as _, Result};
use serde::Serialize;

use dukan_core::{NewInventoryMovement, Product, ProductVariant};

use super::Context;
use crate::output::{print_json, render_variant};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VariantView {
    #[serde(flatten)]
    variant: ProductVariant,
    product: Option<Product>,
}

async fn find_variant(ctx: &Context, code: &str) -> Result<ProductVariant> {
    ctx.db
        .variants()
        .lookup(code)
        .await?
        .with_context(|| format!("no variant with SKU or barcode '{}'", code))
}

pub async fn lookup(ctx: &Context, code: &str) -> Result<()> {
    let variant = find_variant(ctx, code).await?;
    let product = ctx.db.products().find_unique(&variant.product_id).await?;

    if ctx.json {
        return print_json(&VariantView { variant, product });
    }
    render_variant(&variant, product.as_ref().map(|p| p.name.as_str()));
    Ok(())
}

pub async fn low(ctx: &Context) -> Result<()> {
    let variants = ctx.db.variants().low_stock().await?;
    if ctx.json {
        return print_json(&variants);
    }
    if variants.is_empty() {
        println!("No variants below their reorder level");
    }
    for variant in &variants {
        let product = ctx.db.products().find_unique(&variant.product_id).await?;
        render_variant(variant, product.as_ref().map(|p| p.name.as_str()));
    }
    Ok(())
}

pub async fn adjust(
    ctx: &Context,
    code: &str,
    delta: i64,
    reason: Option<String>,
    by: &str,
) -> Result<()> {
    let variant = find_variant(ctx, code).await?;

    let mut movement = NewInventoryMovement::new(&variant.id, "adjustment", delta, by);
    if let Some(reason) = reason {
        movement = movement.with_reason(reason);
    }

    let (movement, variant) = ctx
        .db
        .inventory()
        .record_with_stock_delta(movement, delta)
        .await?;

    ctx.db
        .audit_logs()
        .log(
            "stock.adjust",
            format!("sku={} delta={} by={}", variant.sku, delta, by),
            None,
        )
        .await?;

    if ctx.json {
        return print_json(&movement);
    }
    println!(
        "{} stock {:+} → {}{}",
        variant.sku,
        delta,
        variant.stock,
        if variant.is_low_stock() { " (low)" } else { "" }
    );
    Ok(())
}

//! Text and JSON rendering.

use anyhow::Result;
use serde::Serialize;

use dukan_core::{AuditLog, PrinterConfig, ProductVariant, User};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn render_user(user: &User) {
    let permissions: Vec<String> = user.permissions().iter().map(|p| p.to_string()).collect();
    println!(
        "- {} • {} • role {} • {} • {}",
        user.username,
        user.name,
        user.role,
        if user.is_active { "active" } else { "inactive" },
        if permissions.is_empty() {
            "no permissions".to_string()
        } else {
            permissions.join(", ")
        }
    );
}

pub fn render_variant(variant: &ProductVariant, product_name: Option<&str>) {
    println!(
        "- {} • {} • {}{} • MRP {:.2} • price {:.2} • stock {} (min {})",
        variant.sku,
        variant.barcode,
        product_name.unwrap_or("?"),
        variant
            .info()
            .map(|info| format!(" ({})", info))
            .unwrap_or_default(),
        variant.mrp,
        variant.selling_price,
        variant.stock,
        variant.min_stock
    );
}

pub fn render_printer(printer: &PrinterConfig) {
    println!(
        "- {} • {} • port {} • {} mm • {}",
        printer.printer_type,
        printer.printer_name,
        printer.port.as_deref().unwrap_or("-"),
        printer.width,
        if printer.is_active { "active" } else { "inactive" }
    );
}

pub fn render_audit(entry: &AuditLog, username: Option<&str>) {
    println!(
        "- {} • {} • {}{}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.action,
        username.unwrap_or("system"),
        if entry.details.is_empty() {
            String::new()
        } else {
            format!(" • {}", entry.details)
        }
    );
}

//! `settings get|set|list` and `printer list|set`.

use anyhow::{Context as _, Result};

use dukan_core::NewPrinterConfig;

use super::Context;
use crate::output::{print_json, render_printer};

pub async fn get(ctx: &Context, key: &str) -> Result<()> {
    let setting = ctx
        .db
        .settings()
        .find_by_key(key)
        .await?
        .with_context(|| format!("setting '{}' is not set", key))?;

    if ctx.json {
        return print_json(&setting);
    }
    println!("{}", setting.value);
    Ok(())
}

pub async fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let setting = ctx.db.settings().set(key, value).await?;
    ctx.db
        .audit_logs()
        .log("settings.set", format!("{}={}", key, value), None)
        .await?;

    if ctx.json {
        return print_json(&setting);
    }
    println!("{} = {}", setting.key, setting.value);
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let settings = ctx.db.settings().all().await?;
    if ctx.json {
        return print_json(&settings);
    }
    for setting in &settings {
        println!("{} = {}", setting.key, setting.value);
    }
    Ok(())
}

pub async fn printers(ctx: &Context) -> Result<()> {
    let printers = ctx.db.printers().list().await?;
    if ctx.json {
        return print_json(&printers);
    }
    if printers.is_empty() {
        println!("No printers configured");
    }
    for printer in &printers {
        render_printer(printer);
    }
    Ok(())
}

pub struct PrinterArgs {
    pub printer_type: String,
    pub name: String,
    pub port: Option<String>,
    pub width: Option<i64>,
    pub active: bool,
}

pub async fn configure_printer(ctx: &Context, args: PrinterArgs) -> Result<()> {
    let mut input = NewPrinterConfig::new(args.printer_type, args.name);
    input.port = args.port;
    if let Some(width) = args.width {
        input.width = width;
    }
    input.is_active = args.active;

    let printer = ctx.db.printers().configure(input).await?;

    if ctx.json {
        return print_json(&printer);
    }
    render_printer(&printer);
    Ok(())
}

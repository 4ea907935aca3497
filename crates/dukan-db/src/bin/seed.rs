//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Every category of the built-in catalog
//! cargo run -p dukan-db --bin seed
//!
//! # Only the first two categories
//! cargo run -p dukan-db --bin seed -- --categories 2
//!
//! # Specify database path
//! cargo run -p dukan-db --bin seed -- --db ./data/dukan.db
//! ```
//!
//! Seed rows are not queued for sync.

use std::env;

use dukan_db::seed::{catalog_size, seed_demo_data, SeedOptions};
use dukan_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut options = SeedOptions::default();
    let mut db_path = String::from("./dukan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--categories" | "-c" => {
                if i + 1 < args.len() {
                    options.categories = args[i + 1].parse().unwrap_or(catalog_size());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dukan POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --categories <N>  Categories to generate (default: {})",
                    catalog_size()
                );
                println!("  -d, --db <PATH>       Database file path (default: ./dukan_dev.db)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Dukan POS Seed Data Generator");
    println!("================================");
    println!("Database:   {}", db_path);
    println!("Categories: {}", options.categories.min(catalog_size()));
    println!();

    let config = DbConfig::new(&db_path).capture_changes(false);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let start = std::time::Instant::now();
    let report = seed_demo_data(&db, &options).await?;

    if report.skipped {
        println!("⚠ Database already has variants");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!(
        "✓ Generated {} categories, {} products, {} variants in {:?}",
        report.categories,
        report.products,
        report.variants,
        start.elapsed()
    );
    if report.users > 0 {
        println!("  Admin login: {} / {}", options.admin_username, options.admin_password);
    }

    println!();
    println!("Verifying lookups...");
    let hits = db.products().search("kurta", 10).await?;
    println!("  Search 'kurta': {} results", hits.len());
    let low = db.variants().low_stock().await?;
    println!("  Low stock variants: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

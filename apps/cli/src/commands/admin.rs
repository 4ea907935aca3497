//! `migrate`, `seed` and `audit`.

use std::collections::HashMap;

use anyhow::Result;

use dukan_db::seed::{seed_demo_data, SeedOptions};

use super::Context;
use crate::output::{print_json, render_audit};

pub async fn migrate(ctx: &Context) -> Result<()> {
    let before = ctx.db.migration_status().await?;
    ctx.db.run_migrations().await?;
    let after = ctx.db.migration_status().await?;

    if ctx.json {
        return print_json(&after);
    }
    println!(
        "Applied {} migration(s); {}/{} applied, {} pending",
        after.applied.saturating_sub(before.applied),
        after.applied,
        after.total,
        after.pending()
    );
    Ok(())
}

pub async fn seed(ctx: &Context, categories: Option<usize>) -> Result<()> {
    let mut options = SeedOptions::default();
    if let Some(n) = categories {
        options.categories = n;
    }

    let report = seed_demo_data(&ctx.db, &options).await?;

    if ctx.json {
        return print_json(&report);
    }
    if report.skipped {
        println!("Database already has variants; nothing seeded");
    } else {
        println!(
            "Seeded {} categories, {} products, {} variants",
            report.categories, report.products, report.variants
        );
        if report.users > 0 {
            println!("Admin login: {} / {}", options.admin_username, options.admin_password);
        }
    }
    Ok(())
}

pub async fn audit(ctx: &Context, limit: i64, username: Option<&str>) -> Result<()> {
    let entries = match username {
        Some(username) => {
            let user = ctx.user_by_name(username).await?;
            ctx.db.audit_logs().for_user(&user.id, limit).await?
        }
        None => ctx.db.audit_logs().recent(limit).await?,
    };

    if ctx.json {
        return print_json(&entries);
    }

    let mut names: HashMap<String, String> = HashMap::new();
    for user in ctx.db.users().list().await? {
        names.insert(user.id, user.username);
    }

    if entries.is_empty() {
        println!("No audit entries");
    }
    for entry in &entries {
        let name = entry.user_id.as_ref().and_then(|id| names.get(id));
        render_audit(entry, name.map(String::as_str));
    }
    Ok(())
}

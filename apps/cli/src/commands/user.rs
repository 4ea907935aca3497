//! `user create|list|grant|revoke|passwd`.

use anyhow::{bail, Result};
use tracing::info;

use dukan_core::{NewUser, Permission, PermissionSet};

use super::Context;
use crate::output::{print_json, render_user};

pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub permissions: Option<String>,
    pub all_permissions: bool,
}

pub async fn create(ctx: &Context, input: CreateUser) -> Result<()> {
    let permissions = if input.all_permissions {
        PermissionSet::full()
    } else {
        match &input.permissions {
            Some(list) => PermissionSet::parse_list(list)?,
            None => PermissionSet::new(),
        }
    };

    let user = ctx
        .db
        .users()
        .create(
            NewUser::new(&input.username, &input.password, &input.name)
                .with_role(&input.role)
                .with_permissions(permissions),
        )
        .await?;

    ctx.db
        .audit_logs()
        .log("user.create", format!("role={}", user.role), Some(user.id.as_str()))
        .await?;
    info!(username = %user.username, "User created");

    if ctx.json {
        return print_json(&user);
    }
    render_user(&user);
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let users = ctx.db.users().list().await?;
    if ctx.json {
        return print_json(&users);
    }
    for user in &users {
        render_user(user);
    }
    Ok(())
}

/// Grants (`granted = true`) or revokes the named permissions.
pub async fn set_permissions(
    ctx: &Context,
    username: &str,
    names: &[String],
    granted: bool,
) -> Result<()> {
    if names.is_empty() {
        bail!("name at least one permission");
    }
    let parsed = names
        .iter()
        .map(|name| Permission::parse(name))
        .collect::<Result<Vec<_>, _>>()?;

    let user = ctx.user_by_name(username).await?;
    let mut permissions = user.permissions();
    for permission in &parsed {
        if granted {
            permissions.insert(*permission);
        } else {
            permissions.remove(*permission);
        }
    }

    let user = ctx.db.users().set_permissions(&user.id, &permissions).await?;

    let action = if granted { "user.grant" } else { "user.revoke" };
    let details: Vec<String> = parsed.iter().map(|p| p.to_string()).collect();
    ctx.db
        .audit_logs()
        .log(action, details.join(","), Some(user.id.as_str()))
        .await?;

    if ctx.json {
        return print_json(&user);
    }
    render_user(&user);
    Ok(())
}

pub async fn passwd(ctx: &Context, username: &str, password: &str) -> Result<()> {
    let user = ctx.user_by_name(username).await?;
    let user = ctx.db.users().change_password(&user.id, password).await?;
    ctx.db
        .audit_logs()
        .log("user.passwd", "", Some(user.id.as_str()))
        .await?;

    if ctx.json {
        return print_json(&user);
    }
    println!("Password changed for {}", user.username);
    Ok(())
}

//! Command handlers, one module per command group.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use dukan_core::User;
use dukan_db::Database;
use dukan_sync::SyncConfig;

pub mod admin;
pub mod sales;
pub mod settings;
pub mod stock;
pub mod sync;
pub mod user;

/// Shared state for one CLI invocation.
pub struct Context {
    pub db: Database,
    pub json: bool,
    pub config_path: Option<PathBuf>,
}

impl Context {
    pub fn sync_config(&self) -> Result<SyncConfig> {
        SyncConfig::load(self.config_path.clone()).context("failed to load sync config")
    }

    pub async fn user_by_name(&self, username: &str) -> Result<User> {
        self.db
            .users()
            .get_by_username(username)
            .await?
            .with_context(|| format!("no user named '{}'", username))
    }
}

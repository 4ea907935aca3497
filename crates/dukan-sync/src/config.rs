//! # Sync Configuration
//!
//! Configuration management for the sync processor.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKAN_SYNC_ENDPOINT=https://sync.example.com                       │
//! │     DUKAN_DEVICE_ID=abc-123                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/dukan-pos/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.dukan.pos/sync.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     sync disabled, auto-generated device_id                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Counter 1"
//!
//! [store]
//! id = "store-001"
//! name = "Karol Bagh"
//!
//! [sync]
//! enabled = true
//! endpoint = "https://sync.example.com"
//! api_token = "secret"
//! batch_size = 100
//! poll_interval_secs = 5
//! max_retries = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Counter 1", "Back Office").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "POS Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Configuration for the store this device belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Unique store identifier.
    pub id: String,

    /// Human-readable store name.
    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether the processor should run at all.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the sync endpoint. Batches go to `{endpoint}/sync/batch`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every batch.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Number of queue entries to send per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Interval between poll cycles (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// HTTP request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Rejections an entry may collect before it is parked as `failed`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration (milliseconds) after a transport failure.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Completed entries older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_batch_size() -> usize {
    100
}
fn default_poll_interval() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}
fn default_retention_days() -> i64 {
    7
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: false,
            endpoint: None,
            api_token: None,
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            retention_days: default_retention_days(),
        }
    }
}

impl SyncSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Sync behavior settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a `sync.toml` document. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        if let Some(ref url) = self.sync.endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::InvalidUrl(format!(
                    "Endpoint must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.sync.enabled && self.sync.endpoint.is_none() {
            return Err(SyncError::MissingEndpoint);
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }

        if self.sync.max_retries == 0 {
            return Err(SyncError::InvalidConfig(
                "max_retries must be greater than 0".into(),
            ));
        }

        if self.sync.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `DUKAN_*` overrides looked up through `var`.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `DUKAN_DEVICE_ID` | `device.id` |
    /// | `DUKAN_DEVICE_NAME` | `device.name` |
    /// | `DUKAN_STORE_ID` | `store.id` |
    /// | `DUKAN_SYNC_ENABLED` | `sync.enabled` |
    /// | `DUKAN_SYNC_ENDPOINT` | `sync.endpoint` |
    /// | `DUKAN_SYNC_TOKEN` | `sync.api_token` |
    /// | `DUKAN_SYNC_BATCH_SIZE` | `sync.batch_size` |
    /// | `DUKAN_SYNC_POLL_INTERVAL` | `sync.poll_interval_secs` |
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(id) = var("DUKAN_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(name) = var("DUKAN_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(id) = var("DUKAN_STORE_ID") {
            self.store.id = id;
        }

        if let Some(enabled) = var("DUKAN_SYNC_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sync.enabled = true,
                "0" | "false" | "no" | "off" => self.sync.enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid DUKAN_SYNC_ENABLED"),
            }
        }

        if let Some(url) = var("DUKAN_SYNC_ENDPOINT") {
            debug!(url = %url, "Overriding sync endpoint from environment");
            self.sync.endpoint = Some(url);
        }

        if let Some(token) = var("DUKAN_SYNC_TOKEN") {
            self.sync.api_token = Some(token);
        }

        if let Some(size) = var("DUKAN_SYNC_BATCH_SIZE") {
            match size.parse::<usize>() {
                Ok(n) => self.sync.batch_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid DUKAN_SYNC_BATCH_SIZE"),
            }
        }

        if let Some(secs) = var("DUKAN_SYNC_POLL_INTERVAL") {
            match secs.parse::<u64>() {
                Ok(n) => self.sync.poll_interval_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring invalid DUKAN_SYNC_POLL_INTERVAL"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "dukan", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.enabled
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.sync.endpoint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty());
        assert!(!config.is_sync_enabled());
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.sync.max_retries, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml(
            r#"
            [device]
            id = "counter-1"

            [sync]
            enabled = true
            endpoint = "https://sync.example.com"
            batch_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.device_id(), "counter-1");
        assert_eq!(config.device.name, "POS Terminal");
        assert_eq!(config.store_id(), "default-store");
        assert_eq!(config.sync.batch_size, 25);
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.device.id = String::new();
        assert!(matches!(config.validate(), Err(SyncError::MissingDeviceId)));
        config.device.id = "test".to_string();

        config.sync.enabled = true;
        assert!(matches!(config.validate(), Err(SyncError::MissingEndpoint)));

        config.sync.endpoint = Some("ws://localhost:8080".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.sync.endpoint = Some("http://localhost:8080".to_string());
        assert!(config.validate().is_ok());

        config.sync.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DUKAN_DEVICE_ID", "counter-2"),
            ("DUKAN_SYNC_ENABLED", "yes"),
            ("DUKAN_SYNC_ENDPOINT", "https://sync.example.com"),
            ("DUKAN_SYNC_TOKEN", "t0ken"),
            ("DUKAN_SYNC_BATCH_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.device_id(), "counter-2");
        assert!(config.is_sync_enabled());
        assert_eq!(config.endpoint(), Some("https://sync.example.com"));
        assert_eq!(config.sync.api_token.as_deref(), Some("t0ken"));
        assert_eq!(config.sync.batch_size, 100);
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[sync]"));

        let parsed = SyncConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.device_id(), config.device_id());
    }
}

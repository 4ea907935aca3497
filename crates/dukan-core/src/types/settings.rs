//! Key/value settings and printer configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::default_true;
use crate::update::{double_option, FieldUpdate};
use crate::validation::{validate_count, validate_optional_text, validate_text};
use crate::DEFAULT_PRINTER_WIDTH;

// =============================================================================
// Setting
// =============================================================================

/// One store setting. Values are strings; structured values are JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: String,
    pub key: String,
    pub value: String,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Printer Config
// =============================================================================

/// Configuration for one printer role (`receipt`, `label`, ...). At most one
/// row per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PrinterConfig {
    pub id: String,

    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub printer_type: String,

    pub printer_name: String,

    /// `COM3`, `/dev/usb/lp0`, `192.168.1.50:9100`, ...
    pub port: Option<String>,

    /// Paper width in millimetres.
    pub width: i64,

    /// Driver-specific options as JSON text.
    pub settings: Option<String>,

    pub is_active: bool,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn default_width() -> i64 {
    DEFAULT_PRINTER_WIDTH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrinterConfig {
    #[serde(rename = "type")]
    pub printer_type: String,
    pub printer_name: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_width")]
    pub width: i64,
    #[serde(default)]
    pub settings: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewPrinterConfig {
    pub fn new(printer_type: impl Into<String>, printer_name: impl Into<String>) -> Self {
        NewPrinterConfig {
            printer_type: printer_type.into(),
            printer_name: printer_name.into(),
            port: None,
            width: DEFAULT_PRINTER_WIDTH,
            settings: None,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("type", &self.printer_type, 50)?;
        validate_text("printerName", &self.printer_name, 200)?;
        validate_optional_text("port", self.port.as_deref(), 200)?;
        validate_count("width", self.width)?;
        if let Some(settings) = &self.settings {
            validate_json("settings", settings)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrinterConfigUpdate {
    pub printer_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub port: Option<Option<String>>,
    pub width: Option<FieldUpdate<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub settings: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl PrinterConfigUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_text("printerName", self.printer_name.as_deref(), 200)?;
        if let Some(port) = &self.port {
            validate_optional_text("port", port.as_deref(), 200)?;
        }
        if let Some(width) = &self.width {
            width.validate_non_negative("width")?;
        }
        if let Some(Some(settings)) = &self.settings {
            validate_json("settings", settings)?;
        }
        Ok(())
    }
}

fn validate_json(field: &str, text: &str) -> Result<(), ValidationError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("must be JSON: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_defaults() {
        let input: NewPrinterConfig =
            serde_json::from_str(r#"{"type":"receipt","printerName":"TVS RP3160"}"#).unwrap();
        assert_eq!(input.width, 80);
        assert!(input.is_active);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_printer_settings_must_be_json() {
        let mut input = NewPrinterConfig::new("label", "Zebra");
        input.settings = Some(r#"{"dpi":203}"#.to_string());
        assert!(input.validate().is_ok());

        input.settings = Some("dpi=203".to_string());
        assert!(input.validate().is_err());
    }
}

//! Printer configuration repository. One row per printer type.

use chrono::Utc;
use tracing::info;

use dukan_core::{new_id, NewPrinterConfig, PrinterConfig, PrinterConfigUpdate, ValidationError};

use super::{Insertable, Patch, Repository};
use crate::error::DbResult;
use crate::ops;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::PrinterConfigField;

impl Insertable for NewPrinterConfig {
    type Row = PrinterConfig;

    fn validate(&self) -> Result<(), ValidationError> {
        NewPrinterConfig::validate(self)
    }

    fn into_row(self) -> DbResult<PrinterConfig> {
        Ok(PrinterConfig {
            id: new_id(),
            printer_type: self.printer_type.trim().to_string(),
            printer_name: self.printer_name,
            port: self.port,
            width: self.width,
            settings: self.settings,
            is_active: self.is_active,
            updated_at: Utc::now(),
        })
    }
}

impl Patch for PrinterConfigUpdate {
    type Row = PrinterConfig;

    fn validate(&self) -> Result<(), ValidationError> {
        PrinterConfigUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<PrinterConfigField>> {
        let mut out = Vec::new();
        if let Some(name) = self.printer_name {
            out.push(Assignment::set(PrinterConfigField::PrinterName, name));
        }
        if let Some(port) = self.port {
            out.push(Assignment::set(PrinterConfigField::Port, port));
        }
        if let Some(width) = self.width {
            out.push(Assignment::from_update(PrinterConfigField::Width, width));
        }
        if let Some(settings) = self.settings {
            out.push(Assignment::set(PrinterConfigField::Settings, settings));
        }
        if let Some(is_active) = self.is_active {
            out.push(Assignment::set(PrinterConfigField::IsActive, is_active));
        }
        out
    }
}

impl<'c> Repository<'c, PrinterConfig> {
    pub async fn get_by_type(&mut self, printer_type: &str) -> DbResult<Option<PrinterConfig>> {
        self.find_first(FindMany::from(Filter::eq(
            PrinterConfigField::Type,
            printer_type.trim(),
        )))
        .await
    }

    /// Creates the config for `input.printer_type`, or replaces every field
    /// of the existing one.
    pub async fn configure(&mut self, input: NewPrinterConfig) -> DbResult<PrinterConfig> {
        input.validate()?;
        let row = input.into_row()?;

        let capture = self.captures();
        let mut conn = self.writer().await?;

        let existing = ops::find_many::<PrinterConfig>(
            &mut conn,
            &FindMany::from(Filter::eq(PrinterConfigField::Type, row.printer_type.as_str())).take(1),
        )
        .await?
        .pop();

        let config = match existing {
            Some(existing) => {
                ops::update_fields::<PrinterConfig>(
                    &mut conn,
                    &existing.id,
                    &[
                        Assignment::set(PrinterConfigField::PrinterName, row.printer_name),
                        Assignment::set(PrinterConfigField::Port, row.port),
                        Assignment::set(PrinterConfigField::Width, row.width),
                        Assignment::set(PrinterConfigField::Settings, row.settings),
                        Assignment::set(PrinterConfigField::IsActive, row.is_active),
                    ],
                    capture,
                )
                .await?
            }
            None => ops::insert(&mut conn, &row, capture).await?,
        };

        conn.commit().await?;

        info!(
            printer_type = %config.printer_type,
            printer_name = %config.printer_name,
            "Printer configured"
        );
        Ok(config)
    }

    /// Active printers, by type.
    pub async fn active(&mut self) -> DbResult<Vec<PrinterConfig>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(PrinterConfigField::IsActive, true))
                .order_by(OrderBy::asc(PrinterConfigField::Type)),
        )
        .await
    }

    pub async fn list(&mut self) -> DbResult<Vec<PrinterConfig>> {
        self.find_many(FindMany::new().order_by(OrderBy::asc(PrinterConfigField::Type)))
            .await
    }

    pub async fn set_active(&mut self, id: &str, active: bool) -> DbResult<PrinterConfig> {
        self.update_fields(id, &[Assignment::set(PrinterConfigField::IsActive, active)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{FieldUpdate, NewPrinterConfig, PrinterConfigUpdate};

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_configure_replaces_by_type() {
        let db = fixtures::db().await;

        let mut receipt = NewPrinterConfig::new("receipt", "TVS RP3160");
        receipt.port = Some("COM3".to_string());
        let first = db.printers().configure(receipt).await.unwrap();

        let second = db
            .printers()
            .configure(NewPrinterConfig::new("receipt", "Epson TM-T82"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.printer_name, "Epson TM-T82");
        assert_eq!(second.port, None);
        assert_eq!(db.printers().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_active_and_type_uniqueness() {
        let db = fixtures::db().await;
        let label = db
            .printers()
            .configure(NewPrinterConfig::new("label", "Zebra"))
            .await
            .unwrap();
        db.printers()
            .configure(NewPrinterConfig::new("receipt", "TVS"))
            .await
            .unwrap();

        db.printers().set_active(&label.id, false).await.unwrap();
        let active = db.printers().active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].printer_type, "receipt");

        let err = db
            .printers()
            .create(NewPrinterConfig::new("label", "Other"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unique constraint failed on type");

        let narrowed = db
            .printers()
            .update(
                &label.id,
                PrinterConfigUpdate {
                    width: Some(FieldUpdate::Set(58)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(narrowed.width, 58);
        assert_eq!(db.printers().get_by_type("label").await.unwrap().unwrap().width, 58);
    }
}

//! # Settings Repository
//!
//! String key/value store for store-wide settings.
//!
//! ```text
//! set("store.name", "Anand Textiles")
//!     │
//!     ├── key absent  → INSERT            (SyncQueue: create)
//!     └── key present → UPDATE "value"    (SyncQueue: update)
//! ```
//!
//! Structured values are stored as JSON text through
//! [`set_json`](Repository::set_json) / [`get_json`](Repository::get_json).

use std::fmt::Display;
use std::str::FromStr;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use dukan_core::validation::validate_setting_key;
use dukan_core::{new_id, Setting, ValidationError};

use super::Repository;
use crate::error::{DbError, DbResult};
use crate::ops;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::SettingField;

impl<'c> Repository<'c, Setting> {
    pub async fn find_by_key(&mut self, key: &str) -> DbResult<Option<Setting>> {
        self.find_first(FindMany::from(Filter::eq(SettingField::Key, key.trim())))
            .await
    }

    /// The stored value for `key`.
    pub async fn get_value(&mut self, key: &str) -> DbResult<Option<String>> {
        Ok(self.find_by_key(key).await?.map(|s| s.value))
    }

    /// The stored value for `key`, parsed.
    pub async fn get_parsed<V>(&mut self, key: &str) -> DbResult<Option<V>>
    where
        V: FromStr,
        V::Err: Display,
    {
        let Some(raw) = self.get_value(key).await? else {
            return Ok(None);
        };
        raw.trim().parse::<V>().map(Some).map_err(|e| {
            DbError::Validation(ValidationError::InvalidFormat {
                field: key.to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub async fn get_json<V: DeserializeOwned>(&mut self, key: &str) -> DbResult<Option<V>> {
        match self.get_value(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Inserts or replaces the value for `key`.
    pub async fn set(&mut self, key: &str, value: impl Into<String>) -> DbResult<Setting> {
        validate_setting_key(key)?;
        let key = key.trim();
        let value = value.into();

        let capture = self.captures();
        let mut conn = self.writer().await?;

        let existing = ops::find_many::<Setting>(
            &mut conn,
            &FindMany::from(Filter::eq(SettingField::Key, key)).take(1),
        )
        .await?
        .pop();

        let setting = match existing {
            Some(existing) => {
                ops::update_fields::<Setting>(
                    &mut conn,
                    &existing.id,
                    &[Assignment::set(SettingField::Value, value)],
                    capture,
                )
                .await?
            }
            None => {
                let row = Setting {
                    id: new_id(),
                    key: key.to_string(),
                    value,
                    updated_at: Utc::now(),
                };
                ops::insert(&mut conn, &row, capture).await?
            }
        };

        conn.commit().await?;

        debug!(key, "Setting stored");
        Ok(setting)
    }

    pub async fn set_json<V: Serialize>(&mut self, key: &str, value: &V) -> DbResult<Setting> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }

    /// Removes `key`. Returns whether it existed.
    pub async fn remove(&mut self, key: &str) -> DbResult<bool> {
        let removed = self
            .delete_many(Some(Filter::eq(SettingField::Key, key.trim())))
            .await?;
        Ok(removed > 0)
    }

    /// Every setting, by key.
    pub async fn all(&mut self) -> DbResult<Vec<Setting>> {
        self.find_many(FindMany::new().order_by(OrderBy::asc(SettingField::Key)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{SyncAction, SyncQueueEntry};

    use crate::query::{Filter, FindMany, OrderBy};
    use crate::repository::fixtures;
    use crate::schema::SyncQueueField;

    #[tokio::test]
    async fn test_set_is_an_upsert() {
        let db = fixtures::db().await;

        let first = db.settings().set("store.name", "Anand Textiles").await.unwrap();
        let second = db.settings().set("store.name", "Anand Silks").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.settings().count(None).await.unwrap(), 1);
        assert_eq!(
            db.settings().get_value("store.name").await.unwrap().as_deref(),
            Some("Anand Silks")
        );

        let actions: Vec<SyncAction> = db
            .sync_queue()
            .find_many(
                FindMany::new()
                    .filter(Filter::eq(SyncQueueField::Model, "Setting"))
                    .order_by(OrderBy::asc(SyncQueueField::CreatedAt)),
            )
            .await
            .unwrap()
            .iter()
            .map(|e: &SyncQueueEntry| e.action)
            .collect();
        assert_eq!(actions, [SyncAction::Create, SyncAction::Update]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_keeps_one_row() {
        let (_dir, db) = fixtures::file_db().await;

        let tasks: Vec<_> = (0..6)
            .map(|n| {
                let db = db.clone();
                tokio::spawn(async move { db.settings().set("receipt.footer", format!("v{n}")).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(db.settings().count(None).await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_typed_values() {
        let db = fixtures::db().await;
        db.settings().set("tax.gst_percent", "5").await.unwrap();
        db.settings()
            .set_json("receipt.footer", &vec!["Thank you", "Visit again"])
            .await
            .unwrap();

        assert_eq!(db.settings().get_parsed::<f64>("tax.gst_percent").await.unwrap(), Some(5.0));
        assert!(db.settings().get_parsed::<i64>("missing").await.unwrap().is_none());
        let footer: Vec<String> = db.settings().get_json("receipt.footer").await.unwrap().unwrap();
        assert_eq!(footer.len(), 2);

        db.settings().set("tax.gst_percent", "five").await.unwrap();
        assert!(db.settings().get_parsed::<f64>("tax.gst_percent").await.is_err());
    }

    #[tokio::test]
    async fn test_bad_key_and_remove() {
        let db = fixtures::db().await;
        assert!(db.settings().set("store name", "x").await.is_err());

        db.settings().set("b", "2").await.unwrap();
        db.settings().set("a", "1").await.unwrap();
        let keys: Vec<String> = db.settings().all().await.unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, ["a", "b"]);

        assert!(db.settings().remove("a").await.unwrap());
        assert!(!db.settings().remove("a").await.unwrap());
    }
}

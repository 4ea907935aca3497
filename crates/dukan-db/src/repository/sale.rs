//! # Sale Repository
//!
//! Bills and their line items.
//!
//! ## Creating a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SINGLE TRANSACTION                                   │
//! │                                                                         │
//! │  1. billNo = input.billNo ?? SELECT COALESCE(MAX("billNo"), 0) + 1      │
//! │  2. INSERT INTO "Sale" ...               (+ SyncQueue create)           │
//! │  3. INSERT INTO "SaleItem" ... per item  (+ SyncQueue create each)      │
//! │                                                                         │
//! │  COMMIT ← header and items land together or not at all                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are stored as given. Nothing here recomputes `grandTotal` from the
//! items or touches stock; callers record stock movements themselves.
//!
//! `billNo` is not unique: imported historical bills may repeat numbers.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use dukan_core::{new_id, NewSale, Sale, SaleItem, SaleUpdate, SaleWithItems, ValidationError};

use super::{Patch, Repository};
use crate::error::{DbError, DbResult};
use crate::ops;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::{SaleField, SaleItemField};

async fn next_bill_no(conn: &mut SqliteConnection) -> DbResult<i64> {
    let next: i64 = sqlx::query_scalar(r#"SELECT COALESCE(MAX("billNo"), 0) + 1 FROM "Sale""#)
        .fetch_one(&mut *conn)
        .await?;
    Ok(next)
}

async fn load_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    ops::find_many::<SaleItem>(
        conn,
        &FindMany::new()
            .filter(Filter::eq(SaleItemField::SaleId, sale_id))
            .order_by(OrderBy::asc(SaleItemField::CreatedAt))
            .order_by(OrderBy::asc(SaleItemField::Id)),
    )
    .await
}

impl Patch for SaleUpdate {
    type Row = Sale;

    fn validate(&self) -> Result<(), ValidationError> {
        SaleUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<SaleField>> {
        let mut out = Vec::new();
        if let Some(bill_no) = self.bill_no {
            out.push(Assignment::set(SaleField::BillNo, bill_no));
        }
        if let Some(user_id) = self.user_id {
            out.push(Assignment::set(SaleField::UserId, user_id));
        }
        if let Some(name) = self.customer_name {
            out.push(Assignment::set(SaleField::CustomerName, name));
        }
        if let Some(phone) = self.customer_phone {
            out.push(Assignment::set(SaleField::CustomerPhone, phone));
        }
        for (field, update) in [
            (SaleField::Subtotal, self.subtotal),
            (SaleField::Discount, self.discount),
            (SaleField::DiscountPercent, self.discount_percent),
            (SaleField::TaxAmount, self.tax_amount),
            (SaleField::Cgst, self.cgst),
            (SaleField::Sgst, self.sgst),
            (SaleField::GrandTotal, self.grand_total),
            (SaleField::PaidAmount, self.paid_amount),
            (SaleField::ChangeAmount, self.change_amount),
        ] {
            if let Some(update) = update {
                out.push(Assignment::from_update(field, update));
            }
        }
        if let Some(method) = self.payment_method {
            out.push(Assignment::set(SaleField::PaymentMethod, method));
        }
        if let Some(status) = self.status {
            out.push(Assignment::set(SaleField::Status, status));
        }
        if let Some(remarks) = self.remarks {
            out.push(Assignment::set(SaleField::Remarks, remarks));
        }
        if let Some(is_historical) = self.is_historical {
            out.push(Assignment::set(SaleField::IsHistorical, is_historical));
        }
        if let Some(imported_from) = self.imported_from {
            out.push(Assignment::set(SaleField::ImportedFrom, imported_from));
        }
        out
    }
}

impl<'c> Repository<'c, Sale> {
    /// Creates a sale and all of its items in one transaction.
    pub async fn create_with_items(&mut self, input: NewSale) -> DbResult<SaleWithItems> {
        input.validate()?;

        let capture = self.captures();
        let mut conn = self.writer().await?;

        let bill_no = match input.bill_no {
            Some(bill_no) => bill_no,
            None => next_bill_no(&mut conn).await?,
        };
        let now = Utc::now();
        let created_at = input.created_at.unwrap_or(now);

        let sale = Sale {
            id: new_id(),
            bill_no,
            user_id: input.user_id,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            subtotal: input.subtotal,
            discount: input.discount,
            discount_percent: input.discount_percent,
            tax_amount: input.tax_amount,
            cgst: input.cgst,
            sgst: input.sgst,
            grand_total: input.grand_total,
            payment_method: input.payment_method,
            paid_amount: input.paid_amount,
            change_amount: input.change_amount,
            status: input.status,
            remarks: input.remarks,
            is_historical: input.is_historical,
            imported_from: input.imported_from,
            created_at,
            updated_at: now,
        };
        let sale = ops::insert(&mut conn, &sale, capture).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            let row = SaleItem {
                id: new_id(),
                sale_id: sale.id.clone(),
                variant_id: item.variant_id,
                product_name: item.product_name,
                variant_info: item.variant_info,
                quantity: item.quantity,
                mrp: item.mrp,
                selling_price: item.selling_price,
                discount: item.discount,
                tax_rate: item.tax_rate,
                tax_amount: item.tax_amount,
                total: item.total,
                created_at,
            };
            items.push(ops::insert(&mut conn, &row, capture).await?);
        }

        conn.commit().await?;

        info!(
            id = %sale.id,
            bill_no = sale.bill_no,
            items = items.len(),
            grand_total = sale.grand_total,
            "Sale created"
        );
        Ok(SaleWithItems { sale, items })
    }

    /// The bill number the next sale would get.
    pub async fn next_bill_no(&mut self) -> DbResult<i64> {
        let mut conn = self.reader().await?;
        next_bill_no(&mut conn).await
    }

    pub async fn get_with_items(&mut self, id: &str) -> DbResult<Option<SaleWithItems>> {
        let mut conn = self.reader().await?;
        let Some(sale) = ops::find_unique::<Sale>(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = load_items(&mut conn, id).await?;
        Ok(Some(SaleWithItems { sale, items }))
    }

    /// The most recent sale carrying `bill_no`.
    pub async fn get_by_bill_no(&mut self, bill_no: i64) -> DbResult<Option<Sale>> {
        self.find_first(
            FindMany::new()
                .filter(Filter::eq(SaleField::BillNo, bill_no))
                .order_by(OrderBy::desc(SaleField::CreatedAt)),
        )
        .await
    }

    pub async fn items(&mut self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.reader().await?;
        load_items(&mut conn, sale_id).await
    }

    /// Deletes a sale and its items together. Returns what was removed.
    pub async fn delete_with_items(&mut self, id: &str) -> DbResult<SaleWithItems> {
        let capture = self.captures();
        let mut conn = self.writer().await?;

        let items = load_items(&mut conn, id).await?;
        if !items.is_empty() {
            ops::delete_many::<SaleItem>(
                &mut conn,
                Some(&Filter::eq(SaleItemField::SaleId, id)),
                capture,
            )
            .await?;
        }
        let sale = ops::delete::<Sale>(&mut conn, id, capture).await?;

        conn.commit().await?;

        info!(id, bill_no = sale.bill_no, items = items.len(), "Sale deleted");
        Ok(SaleWithItems { sale, items })
    }

    /// Sales with `from <= createdAt < to`, oldest first.
    pub async fn list_between(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        if to < from {
            return Err(DbError::Validation(ValidationError::InvalidFormat {
                field: "to".to_string(),
                reason: "must not be before from".to_string(),
            }));
        }
        debug!(%from, %to, "Listing sales");
        self.find_many(
            FindMany::new()
                .filter(Filter::between(SaleField::CreatedAt, from, to))
                .order_by(OrderBy::asc(SaleField::CreatedAt))
                .order_by(OrderBy::asc(SaleField::BillNo)),
        )
        .await
    }
}

impl<'c> Repository<'c, SaleItem> {
    pub async fn for_sale(&mut self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.reader().await?;
        load_items(&mut conn, sale_id).await
    }

    /// Every line that sold `variant_id`, newest first.
    pub async fn for_variant(&mut self, variant_id: &str) -> DbResult<Vec<SaleItem>> {
        self.find_many(
            FindMany::new()
                .filter(Filter::eq(SaleItemField::VariantId, variant_id))
                .order_by(OrderBy::desc(SaleItemField::CreatedAt)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use dukan_core::{NewSale, NewSaleItem, SaleUpdate};

    use crate::query::{Filter, GroupBy, GroupOrder, SortOrder};
    use crate::repository::fixtures;
    use crate::schema::{SaleField, SyncQueueField};

    async fn setup() -> (crate::Database, NewSale) {
        let db = fixtures::db().await;
        let sale = sale_input(&db).await;
        (db, sale)
    }

    async fn sale_input(db: &crate::Database) -> NewSale {
        let user = fixtures::cashier(db).await;
        let product = fixtures::product(db).await;
        let variant = fixtures::variant(db, &product, "K-M", "1002").await;

        NewSale::new(&user.id).with_item(NewSaleItem::from_variant(&product, &variant, 2, 1798.0))
    }

    #[tokio::test]
    async fn test_nested_create_allocates_bill_numbers() {
        let (db, input) = setup().await;

        let first = db.sales().create_with_items(input.clone()).await.unwrap();
        let second = db.sales().create_with_items(input).await.unwrap();

        assert_eq!(first.sale.bill_no, 1);
        assert_eq!(second.sale.bill_no, 2);
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].sale_id, first.sale.id);
        assert_eq!(first.items[0].variant_info.as_deref(), Some("M"));
        assert_eq!(first.sale.payment_method, "cash");
        assert_eq!(first.sale.status, "completed");
        assert_eq!(db.sales().next_bill_no().await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_get_distinct_bill_numbers() {
        let (_dir, db) = fixtures::file_db().await;
        let input = sale_input(&db).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let input = input.clone();
                tokio::spawn(async move { db.sales().create_with_items(input).await })
            })
            .collect();

        let mut bill_nos = Vec::new();
        for task in tasks {
            bill_nos.push(task.await.unwrap().unwrap().sale.bill_no);
        }
        bill_nos.sort_unstable();
        assert_eq!(bill_nos, (1..=8).collect::<Vec<i64>>());
        assert_eq!(db.sale_items().count(None).await.unwrap(), 8);
        db.close().await;
    }

    #[tokio::test]
    async fn test_explicit_bill_no_may_repeat() {
        let (db, mut input) = setup().await;
        input.bill_no = Some(500);
        input.is_historical = true;
        input.imported_from = Some("legacy.csv".to_string());
        input.created_at = Some(Utc::now() - Duration::days(400));

        db.sales().create_with_items(input.clone()).await.unwrap();
        db.sales().create_with_items(input).await.unwrap();

        assert_eq!(
            db.sales()
                .count(Some(Filter::eq(SaleField::BillNo, 500)))
                .await
                .unwrap(),
            2
        );
        assert!(db.sales().get_by_bill_no(500).await.unwrap().unwrap().is_historical);
        assert_eq!(db.sales().next_bill_no().await.unwrap(), 501);
    }

    #[tokio::test]
    async fn test_failed_item_rolls_back_header() {
        let (db, mut input) = setup().await;
        input.items[0].variant_id = dukan_core::new_id();

        let err = db.sales().create_with_items(input).await.unwrap_err();
        assert_eq!(err.code(), Some("P2003"));
        assert_eq!(db.sales().count(None).await.unwrap(), 0);
        assert_eq!(
            db.sync_queue()
                .count(Some(Filter::eq(SyncQueueField::Model, "Sale")))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_with_items() {
        let (db, input) = setup().await;
        let created = db.sales().create_with_items(input).await.unwrap();

        let err = db.sales().delete(&created.sale.id).await.unwrap_err();
        assert_eq!(err.code(), Some("P2003"));

        let removed = db.sales().delete_with_items(&created.sale.id).await.unwrap();
        assert_eq!(removed.items.len(), 1);
        assert!(db.sales().get_with_items(&created.sale.id).await.unwrap().is_none());
        assert!(db.sale_items().for_sale(&created.sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_between_and_summary() {
        let (db, input) = setup().await;
        let mut old = input.clone();
        old.created_at = Some(Utc::now() - Duration::days(10));
        old.grand_total = 100.0;
        db.sales().create_with_items(old).await.unwrap();

        let mut today = input.clone();
        today.grand_total = 250.0;
        db.sales().create_with_items(today.clone()).await.unwrap();
        today.payment_method = "upi".to_string();
        today.grand_total = 50.0;
        db.sales().create_with_items(today).await.unwrap();

        let from = Utc::now() - Duration::days(1);
        let to = Utc::now() + Duration::minutes(1);
        let recent = db.sales().list_between(from, to).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(db.sales().list_between(to, from).await.is_err());

        let by_method = db
            .sales()
            .group_by(
                GroupBy::new([SaleField::PaymentMethod])
                    .filter(Filter::between(SaleField::CreatedAt, from, to))
                    .count()
                    .sum(SaleField::GrandTotal)
                    .order_by(GroupOrder::Key(SaleField::PaymentMethod, SortOrder::Asc)),
            )
            .await
            .unwrap();
        assert_eq!(by_method.len(), 2);
        assert_eq!(by_method[0].key(SaleField::PaymentMethod).as_str(), Some("cash"));
        assert_eq!(by_method[0].sum_of(SaleField::GrandTotal), Some(250.0));
        assert_eq!(by_method[1].count(), Some(1));
    }

    #[tokio::test]
    async fn test_void_by_status_update() {
        let (db, input) = setup().await;
        let created = db.sales().create_with_items(input).await.unwrap();

        let voided = db
            .sales()
            .update(&created.sale.id, SaleUpdate::status("void"))
            .await
            .unwrap();
        assert_eq!(voided.status, "void");
        assert_eq!(voided.bill_no, created.sale.bill_no);
    }
}

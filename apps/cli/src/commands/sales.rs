//! `sales summary`.

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use dukan_db::{Filter, GroupBy, GroupOrder, SaleField, SortOrder};

use super::Context;
use crate::output::print_json;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentSummary {
    payment_method: String,
    sales: i64,
    grand_total: f64,
    tax_amount: f64,
    discount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SalesSummary {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    by_payment_method: Vec<PaymentSummary>,
    sales: i64,
    grand_total: f64,
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("'{}' is not a YYYY-MM-DD date", value))
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

/// `[from, to + 1 day)` in UTC. Both default to today.
fn day_range(from: Option<&str>, to: Option<&str>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let first = match from {
        Some(value) => parse_day(value)?,
        None => Utc::now().date_naive(),
    };
    let last = match to {
        Some(value) => parse_day(value)?,
        None => first,
    };
    if last < first {
        bail!("--to ({}) is before --from ({})", last, first);
    }
    Ok((start_of(first), start_of(last) + Duration::days(1)))
}

pub async fn summary(
    ctx: &Context,
    from: Option<&str>,
    to: Option<&str>,
    include_void: bool,
) -> Result<()> {
    let (from, to) = day_range(from, to)?;

    let mut filter = Filter::between(SaleField::CreatedAt, from, to);
    if !include_void {
        filter = filter.and(Filter::ne(SaleField::Status, "void"));
    }

    let groups = ctx
        .db
        .sales()
        .group_by(
            GroupBy::new([SaleField::PaymentMethod])
                .filter(filter)
                .count()
                .sum(SaleField::GrandTotal)
                .sum(SaleField::TaxAmount)
                .sum(SaleField::Discount)
                .order_by(GroupOrder::Key(SaleField::PaymentMethod, SortOrder::Asc)),
        )
        .await?;

    let by_payment_method: Vec<PaymentSummary> = groups
        .iter()
        .map(|group| PaymentSummary {
            payment_method: group.key(SaleField::PaymentMethod).to_string(),
            sales: group.count().unwrap_or(0),
            grand_total: group.sum_of(SaleField::GrandTotal).unwrap_or(0.0),
            tax_amount: group.sum_of(SaleField::TaxAmount).unwrap_or(0.0),
            discount: group.sum_of(SaleField::Discount).unwrap_or(0.0),
        })
        .collect();

    let summary = SalesSummary {
        from,
        to,
        sales: by_payment_method.iter().map(|s| s.sales).sum(),
        grand_total: by_payment_method.iter().map(|s| s.grand_total).sum(),
        by_payment_method,
    };

    if ctx.json {
        return print_json(&summary);
    }

    println!(
        "Sales {} → {}",
        summary.from.format("%Y-%m-%d"),
        (summary.to - Duration::days(1)).format("%Y-%m-%d")
    );
    for row in &summary.by_payment_method {
        println!(
            "- {:<8} {:>5} sales • total {:>12.2} • tax {:>10.2} • discount {:>10.2}",
            row.payment_method, row.sales, row.grand_total, row.tax_amount, row.discount
        );
    }
    println!("  {:<8} {:>5} sales • total {:>12.2}", "all", summary.sales, summary.grand_total);
    Ok(())
}

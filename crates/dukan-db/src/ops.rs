//! # Table Operations
//!
//! Generic statements over any [`Table`], run on a borrowed connection so the
//! same code serves pooled reads and open transactions.
//!
//! ```text
//! insert        INSERT INTO "T" (...) VALUES (...) RETURNING *
//! insert_many   INSERT [OR IGNORE] ... per row
//! find_unique   SELECT * FROM "T" WHERE "id" = ?
//! find_many     SELECT * FROM "T" [WHERE] [ORDER BY] [LIMIT/OFFSET]
//! count         SELECT COUNT(*) FROM "T" [WHERE]
//! update_fields UPDATE "T" SET ... WHERE "id" = ? RETURNING *
//! update_many   UPDATE "T" SET ... [WHERE] RETURNING *
//! delete        DELETE FROM "T" WHERE "id" = ? RETURNING *
//! delete_many   DELETE FROM "T" [WHERE] RETURNING "id"
//! aggregate     SELECT COUNT(*), SUM(..) ... FROM "T" [WHERE]
//! group_by      SELECT keys, aggregates ... GROUP BY keys [HAVING] ...
//! ```
//!
//! Every write with `capture` set also appends a `SyncQueue` row on the same
//! connection, so it commits or rolls back with the write.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use dukan_core::{new_id, NewSyncQueueEntry, SyncAction, SyncQueueEntry, SyncStatus};

use crate::error::{DbError, DbResult};
use crate::query::{
    push_aggregate, push_assignments, push_group_by, push_order_and_page, push_value,
    push_where, read_aggregate, read_group_row, Aggregate, AggregateResult, Assignment,
    Column, Filter, FindMany, GroupBy, GroupRow, Value,
};
use crate::schema::Table;

fn table<T: Table>() -> String {
    format!("\"{}\"", T::NAME)
}

fn touch<T: Table>() -> Option<(&'static str, Value)> {
    T::UPDATED_AT.map(|column| (column, Value::DateTime(Utc::now())))
}

// =============================================================================
// Create
// =============================================================================

async fn insert_row<T: Table>(
    conn: &mut SqliteConnection,
    row: &T,
    or_ignore: bool,
) -> DbResult<Option<T>> {
    let values = row.values();

    let mut qb = QueryBuilder::<Sqlite>::new(if or_ignore {
        "INSERT OR IGNORE INTO "
    } else {
        "INSERT INTO "
    });
    qb.push(table::<T>()).push(" (");
    for (i, (field, _)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(field.quoted());
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, value);
    }
    qb.push(") RETURNING *");

    let inserted = qb.build_query_as::<T>().fetch_optional(&mut *conn).await?;
    Ok(inserted)
}

/// Inserts `row` and returns it as stored.
pub(crate) async fn insert<T: Table>(
    conn: &mut SqliteConnection,
    row: &T,
    capture: bool,
) -> DbResult<T> {
    let inserted = insert_row(conn, row, false)
        .await?
        .ok_or_else(|| DbError::Internal(format!("{} insert returned no row", T::NAME)))?;

    debug!(table = T::NAME, id = %inserted.id(), "Inserted row");

    if capture {
        capture_row(conn, SyncAction::Create, &inserted).await?;
    }
    Ok(inserted)
}

/// Inserts each row; with `skip_duplicates` rows hitting a unique key are
/// skipped instead of failing. Returns how many rows were written.
pub(crate) async fn insert_many<T: Table>(
    conn: &mut SqliteConnection,
    rows: &[T],
    skip_duplicates: bool,
    capture: bool,
) -> DbResult<u64> {
    let mut written = 0u64;
    for row in rows {
        if let Some(inserted) = insert_row(conn, row, skip_duplicates).await? {
            if capture {
                capture_row(conn, SyncAction::Create, &inserted).await?;
            }
            written += 1;
        }
    }

    debug!(table = T::NAME, requested = rows.len(), written, "Inserted rows");
    Ok(written)
}

// =============================================================================
// Read
// =============================================================================

pub(crate) async fn find_unique<T: Table>(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<T>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
    qb.push(table::<T>())
        .push(" WHERE ")
        .push(T::id_field().quoted())
        .push(" = ")
        .push_bind(id.to_string());

    let row = qb.build_query_as::<T>().fetch_optional(&mut *conn).await?;
    Ok(row)
}

pub(crate) async fn find_many<T: Table>(
    conn: &mut SqliteConnection,
    args: &FindMany<T::Field>,
) -> DbResult<Vec<T>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
    qb.push(table::<T>());
    push_where(&mut qb, args.filter.as_ref())?;
    push_order_and_page(&mut qb, &args.order_by, args.skip, args.take)?;

    let rows = qb.build_query_as::<T>().fetch_all(&mut *conn).await?;
    Ok(rows)
}

pub(crate) async fn count<T: Table>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<T::Field>>,
) -> DbResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
    qb.push(table::<T>());
    push_where(&mut qb, filter)?;

    let count = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(count)
}

// =============================================================================
// Update
// =============================================================================

/// Applies `assignments` to one row; [`DbError::NotFound`] when `id` is
/// unknown.
pub(crate) async fn update_fields<T: Table>(
    conn: &mut SqliteConnection,
    id: &str,
    assignments: &[Assignment<T::Field>],
    capture: bool,
) -> DbResult<T> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE ");
    qb.push(table::<T>());
    push_assignments(&mut qb, assignments, touch::<T>())?;
    qb.push(" WHERE ")
        .push(T::id_field().quoted())
        .push(" = ")
        .push_bind(id.to_string());
    qb.push(" RETURNING *");

    let updated = qb
        .build_query_as::<T>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(T::NAME, id))?;

    debug!(table = T::NAME, id, fields = assignments.len(), "Updated row");

    if capture {
        capture_row(conn, SyncAction::Update, &updated).await?;
    }
    Ok(updated)
}

/// Applies `assignments` to every matching row and returns them.
pub(crate) async fn update_many<T: Table>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<T::Field>>,
    assignments: &[Assignment<T::Field>],
    capture: bool,
) -> DbResult<Vec<T>> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE ");
    qb.push(table::<T>());
    push_assignments(&mut qb, assignments, touch::<T>())?;
    push_where(&mut qb, filter)?;
    qb.push(" RETURNING *");

    let updated = qb.build_query_as::<T>().fetch_all(&mut *conn).await?;

    debug!(table = T::NAME, rows = updated.len(), "Updated rows");

    if capture {
        for row in &updated {
            capture_row(conn, SyncAction::Update, row).await?;
        }
    }
    Ok(updated)
}

// =============================================================================
// Delete
// =============================================================================

/// Deletes one row and returns it; [`DbError::NotFound`] when `id` is
/// unknown.
pub(crate) async fn delete<T: Table>(
    conn: &mut SqliteConnection,
    id: &str,
    capture: bool,
) -> DbResult<T> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM ");
    qb.push(table::<T>())
        .push(" WHERE ")
        .push(T::id_field().quoted())
        .push(" = ")
        .push_bind(id.to_string());
    qb.push(" RETURNING *");

    let deleted = qb
        .build_query_as::<T>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(T::NAME, id))?;

    debug!(table = T::NAME, id, "Deleted row");

    if capture {
        enqueue(conn, NewSyncQueueEntry::deleted(T::NAME, deleted.id())).await?;
    }
    Ok(deleted)
}

/// Deletes every matching row and returns how many went.
pub(crate) async fn delete_many<T: Table>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<T::Field>>,
    capture: bool,
) -> DbResult<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM ");
    qb.push(table::<T>());
    push_where(&mut qb, filter)?;
    qb.push(" RETURNING ").push(T::id_field().quoted());

    let ids = qb.build_query_scalar::<String>().fetch_all(&mut *conn).await?;

    debug!(table = T::NAME, rows = ids.len(), "Deleted rows");

    if capture {
        for id in &ids {
            enqueue(conn, NewSyncQueueEntry::deleted(T::NAME, id)).await?;
        }
    }
    Ok(ids.len() as u64)
}

// =============================================================================
// Aggregates
// =============================================================================

pub(crate) async fn aggregate<T: Table>(
    conn: &mut SqliteConnection,
    args: &Aggregate<T::Field>,
) -> DbResult<AggregateResult> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    let slots = push_aggregate(&mut qb, T::NAME, args)?;

    let row = qb.build().fetch_one(&mut *conn).await?;
    Ok(read_aggregate(&row, &slots)?)
}

pub(crate) async fn group_by<T: Table>(
    conn: &mut SqliteConnection,
    args: &GroupBy<T::Field>,
) -> DbResult<Vec<GroupRow>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    let slots = push_group_by(&mut qb, T::NAME, args)?;

    let rows = qb.build().fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|row| read_group_row(row, &slots).map_err(DbError::from))
        .collect()
}

// =============================================================================
// Change Capture
// =============================================================================

/// Appends a pending entry to the sync queue.
pub(crate) async fn enqueue(
    conn: &mut SqliteConnection,
    entry: NewSyncQueueEntry,
) -> DbResult<SyncQueueEntry> {
    entry.validate()?;

    let now = Utc::now();
    let row = SyncQueueEntry {
        id: new_id(),
        action: entry.action,
        model: entry.model,
        data: entry.data,
        status: SyncStatus::Pending,
        retry_count: 0,
        error: None,
        created_at: now,
        updated_at: now,
    };
    insert_row(conn, &row, false)
        .await?
        .ok_or_else(|| DbError::Internal("SyncQueue insert returned no row".into()))
}

async fn capture_row<T: Table>(
    conn: &mut SqliteConnection,
    action: SyncAction,
    row: &T,
) -> DbResult<()> {
    if !T::CAPTURED {
        return Ok(());
    }
    let entry = NewSyncQueueEntry::for_row(action, T::NAME, row)?;
    enqueue(conn, entry).await?;
    Ok(())
}

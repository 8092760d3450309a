//! # Aggregate Repository
//!
//! The aggregate projector. `shelf_aggregates` is a cache of
//! `shelf_batches`; [`refresh`] is the only writer.
//!
//! ## Refresh
//! ```text
//! batch mutation (same tx)
//!      │
//!      ▼
//! refresh(conn, shelf, product, as_of, window)
//!      │
//!      ├── SELECT * FROM shelf_batches WHERE shelf_id = ? AND product_id = ?
//!      ├── ShelfAggregate::fold(...)                     (shelfwise-core)
//!      └── INSERT ... ON CONFLICT (shelf_id, product_id) DO UPDATE
//! ```
//!
//! Every executor that touches a shelf batch calls `refresh` before it
//! commits, so outside a transaction `current_quantity` always equals the
//! batch sum.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::batch::shelf_batches_for_pair;
use shelfwise_core::ShelfAggregate;

const AGGREGATE_COLUMNS: &str = r#"
    shelf_id, product_id, current_quantity, near_expiry_quantity,
    expired_quantity, earliest_expiry, latest_expiry, last_restocked
"#;

/// A pair whose aggregate disagrees with its batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AggregateDrift {
    pub shelf_id: i64,
    pub product_id: i64,
    pub aggregate_quantity: i64,
    pub batch_quantity: i64,
}

/// Recomputes and stores the aggregate for one `(shelf, product)` pair.
pub async fn refresh(
    conn: &mut SqliteConnection,
    shelf_id: i64,
    product_id: i64,
    as_of: NaiveDate,
    window_days: i64,
) -> DbResult<ShelfAggregate> {
    let batches = shelf_batches_for_pair(conn, shelf_id, product_id).await?;
    let aggregate = ShelfAggregate::fold(shelf_id, product_id, &batches, as_of, window_days);

    sqlx::query(
        r#"
        INSERT INTO shelf_aggregates (
            shelf_id, product_id, current_quantity, near_expiry_quantity,
            expired_quantity, earliest_expiry, latest_expiry, last_restocked
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (shelf_id, product_id) DO UPDATE SET
            current_quantity = excluded.current_quantity,
            near_expiry_quantity = excluded.near_expiry_quantity,
            expired_quantity = excluded.expired_quantity,
            earliest_expiry = excluded.earliest_expiry,
            latest_expiry = excluded.latest_expiry,
            last_restocked = excluded.last_restocked
        "#,
    )
    .bind(aggregate.shelf_id)
    .bind(aggregate.product_id)
    .bind(aggregate.current_quantity)
    .bind(aggregate.near_expiry_quantity)
    .bind(aggregate.expired_quantity)
    .bind(aggregate.earliest_expiry)
    .bind(aggregate.latest_expiry)
    .bind(aggregate.last_restocked)
    .execute(&mut *conn)
    .await?;

    debug!(
        shelf_id,
        product_id,
        current = aggregate.current_quantity,
        near_expiry = aggregate.near_expiry_quantity,
        expired = aggregate.expired_quantity,
        "Refreshed shelf aggregate"
    );
    Ok(aggregate)
}

/// Refreshes every pair that has shelf batches. Run at the start of a day so
/// near-expiry and expired counts follow the calendar.
pub async fn refresh_all(
    conn: &mut SqliteConnection,
    as_of: NaiveDate,
    window_days: i64,
) -> DbResult<usize> {
    let pairs: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT DISTINCT shelf_id, product_id FROM shelf_batches ORDER BY shelf_id, product_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    for (shelf_id, product_id) in &pairs {
        refresh(conn, *shelf_id, *product_id, as_of, window_days).await?;
    }
    Ok(pairs.len())
}

/// Repository for aggregate reads.
#[derive(Debug, Clone)]
pub struct AggregateRepository {
    pool: SqlitePool,
}

impl AggregateRepository {
    /// Creates a new AggregateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AggregateRepository { pool }
    }

    pub async fn get(&self, shelf_id: i64, product_id: i64) -> DbResult<Option<ShelfAggregate>> {
        let sql = format!(
            "SELECT {AGGREGATE_COLUMNS} FROM shelf_aggregates WHERE shelf_id = ?1 AND product_id = ?2"
        );
        let row = sqlx::query_as::<_, ShelfAggregate>(&sql)
            .bind(shelf_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn all(&self) -> DbResult<Vec<ShelfAggregate>> {
        let sql = format!(
            "SELECT {AGGREGATE_COLUMNS} FROM shelf_aggregates ORDER BY shelf_id, product_id"
        );
        let rows = sqlx::query_as::<_, ShelfAggregate>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Shelf units of a product according to its aggregates.
    pub async fn shelf_quantity(&self, product_id: i64) -> DbResult<i64> {
        let qty: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_quantity), 0) FROM shelf_aggregates WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(qty)
    }

    /// Pairs where the aggregate and the batch sum disagree, in either
    /// direction (including batches that never got an aggregate row).
    pub async fn drift(&self) -> DbResult<Vec<AggregateDrift>> {
        let rows = sqlx::query_as::<_, AggregateDrift>(
            r#"
            WITH sums AS (
                SELECT shelf_id, product_id, SUM(quantity) AS batch_quantity
                FROM shelf_batches
                GROUP BY shelf_id, product_id
            )
            SELECT a.shelf_id, a.product_id,
                   a.current_quantity AS aggregate_quantity,
                   COALESCE(s.batch_quantity, 0) AS batch_quantity
            FROM shelf_aggregates a
            LEFT JOIN sums s ON s.shelf_id = a.shelf_id AND s.product_id = a.product_id
            WHERE a.current_quantity <> COALESCE(s.batch_quantity, 0)
            UNION ALL
            SELECT s.shelf_id, s.product_id, 0, s.batch_quantity
            FROM sums s
            LEFT JOIN shelf_aggregates a ON a.shelf_id = s.shelf_id AND a.product_id = s.product_id
            WHERE a.shelf_id IS NULL AND s.batch_quantity <> 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

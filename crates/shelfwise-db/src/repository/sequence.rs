//! # Sequence Repository
//!
//! Durable per-series counters behind order, transfer and invoice numbers.
//!
//! ```text
//! next_code(conn, Invoice, 2025-09-14)
//!      │
//!      ├── row for "invoice" missing?
//!      │      └── seed: max sequence parsed from sales_invoices.invoice_no
//!      │                (0 when the table is empty)
//!      │
//!      ├── UPDATE code_sequences SET last_value = last_value + 1
//!      │   WHERE series = 'invoice' RETURNING last_value        → 42
//!      │
//!      └── "INV" + "202509" + "0042"
//! ```
//!
//! The increment runs on the caller's connection, so a rolled-back
//! transaction hands its number back and a committed one keeps it.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shelfwise_core::CodeSeries;

fn source_of(series: CodeSeries) -> (&'static str, &'static str) {
    match series {
        CodeSeries::Order => ("purchase_orders", "order_no"),
        CodeSeries::Transfer => ("stock_transfers", "transfer_code"),
        CodeSeries::Invoice => ("sales_invoices", "invoice_no"),
    }
}

/// Highest sequence among persisted codes of a series, 0 if none parse.
pub async fn latest_persisted_sequence(
    conn: &mut SqliteConnection,
    series: CodeSeries,
) -> DbResult<i64> {
    let (table, column) = source_of(series);
    let sql = format!("SELECT {column} FROM {table} WHERE {column} LIKE ?1");
    let codes: Vec<String> = sqlx::query_scalar(&sql)
        .bind(format!("{}%", series.prefix()))
        .fetch_all(&mut *conn)
        .await?;

    Ok(codes
        .iter()
        .filter_map(|code| series.parse_sequence(code))
        .max()
        .unwrap_or(0))
}

/// Next sequence value for a series.
pub async fn next_value(conn: &mut SqliteConnection, series: CodeSeries) -> DbResult<i64> {
    let current: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM code_sequences WHERE series = ?1")
            .bind(series.key())
            .fetch_optional(&mut *conn)
            .await?;

    if current.is_none() {
        let seed = latest_persisted_sequence(conn, series).await?;
        sqlx::query(
            r#"
            INSERT INTO code_sequences (series, last_value) VALUES (?1, ?2)
            ON CONFLICT (series) DO NOTHING
            "#,
        )
        .bind(series.key())
        .bind(seed)
        .execute(&mut *conn)
        .await?;
        debug!(series = %series, seed, "Seeded code sequence");
    }

    let value: i64 = sqlx::query_scalar(
        r#"
        UPDATE code_sequences
        SET last_value = last_value + 1
        WHERE series = ?1
        RETURNING last_value
        "#,
    )
    .bind(series.key())
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

/// Next formatted code for a series on `date`.
pub async fn next_code(
    conn: &mut SqliteConnection,
    series: CodeSeries,
    date: NaiveDate,
) -> DbResult<String> {
    let value = next_value(conn, series).await?;
    Ok(series.format(date, value))
}

/// Repository for sequence inspection and resets.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Current value of a series, `None` before first use.
    pub async fn current(&self, series: CodeSeries) -> DbResult<Option<i64>> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM code_sequences WHERE series = ?1")
                .bind(series.key())
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_master_data;
    use crate::{Database, DbConfig};

    fn sept() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 14).unwrap()
    }

    #[tokio::test]
    async fn test_empty_series_starts_at_one() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            next_code(&mut tx, CodeSeries::Order, sept()).await.unwrap(),
            "PO202509001"
        );
        assert_eq!(
            next_code(&mut tx, CodeSeries::Order, sept()).await.unwrap(),
            "PO202509002"
        );
        assert_eq!(
            next_code(&mut tx, CodeSeries::Transfer, sept()).await.unwrap(),
            "ST2025090001"
        );
        tx.commit().await.unwrap();
        assert_eq!(db.sequences().current(CodeSeries::Order).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_seeds_from_persisted_codes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let supplier = db.catalog().suppliers().await.unwrap()[0].id;
        let employee = db.catalog().employees().await.unwrap()[0].id;

        for no in ["PO202508017", "PO202509003"] {
            sqlx::query(
                r#"
                INSERT INTO purchase_orders
                    (order_no, supplier_id, employee_id, order_date, status, total_amount)
                VALUES (?1, ?2, ?3, '2025-08-01', 'received', 0)
                "#,
            )
            .bind(no)
            .bind(supplier)
            .bind(employee)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            next_code(&mut tx, CodeSeries::Order, sept()).await.unwrap(),
            "PO202509018"
        );
    }

    #[tokio::test]
    async fn test_rolled_back_number_is_reissued() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(next_value(&mut tx, CodeSeries::Invoice).await.unwrap(), 1);
        }
        let mut tx = db.begin().await.unwrap();
        assert_eq!(next_value(&mut tx, CodeSeries::Invoice).await.unwrap(), 1);
    }
}

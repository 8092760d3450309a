//! # Transfer Repository
//!
//! Stock transfer records. One row per warehouse batch touched.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use shelfwise_core::{Money, StockTransfer};

const TRANSFER_COLUMNS: &str = r#"
    id, transfer_code, product_id, from_warehouse_id, to_shelf_id, quantity,
    transfer_date, employee_id, batch_code, expiry_date, import_price, selling_price
"#;

#[derive(Debug, Clone)]
pub struct NewStockTransfer {
    pub transfer_code: String,
    pub product_id: i64,
    pub from_warehouse_id: i64,
    pub to_shelf_id: i64,
    pub quantity: i64,
    pub transfer_date: NaiveDate,
    pub employee_id: i64,
    pub batch_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub import_price: Money,
    pub selling_price: Money,
}

pub async fn insert_transfer(
    conn: &mut SqliteConnection,
    transfer: &NewStockTransfer,
) -> DbResult<StockTransfer> {
    let sql = format!(
        r#"
        INSERT INTO stock_transfers (
            transfer_code, product_id, from_warehouse_id, to_shelf_id, quantity,
            transfer_date, employee_id, batch_code, expiry_date, import_price, selling_price
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING {TRANSFER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, StockTransfer>(&sql)
        .bind(&transfer.transfer_code)
        .bind(transfer.product_id)
        .bind(transfer.from_warehouse_id)
        .bind(transfer.to_shelf_id)
        .bind(transfer.quantity)
        .bind(transfer.transfer_date)
        .bind(transfer.employee_id)
        .bind(&transfer.batch_code)
        .bind(transfer.expiry_date)
        .bind(transfer.import_price)
        .bind(transfer.selling_price)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// Repository for transfer reads.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    pub async fn for_product(&self, product_id: i64) -> DbResult<Vec<StockTransfer>> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE product_id = ?1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, StockTransfer>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_transfers")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

//! # Batch Repository
//!
//! The batch inventory store: warehouse batches and shelf batches.
//!
//! ## Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE warehouse_batches                                               │
//! │     SET quantity = quantity - :qty                                      │
//! │   WHERE id = :id AND quantity >= :qty                                   │
//! │                                                                         │
//! │  rows_affected == 1 ──► ok                                              │
//! │  rows_affected == 0 ──► re-read quantity ──► InsufficientStock          │
//! │                         (or NotFound if the batch is gone)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The check and the write are one statement, so two writers racing on the
//! same batch cannot both succeed past zero.
//!
//! ## Merge on Restock
//! `(shelf_id, product_id, batch_code)` is the natural key of a shelf batch.
//! Restocking a code that is already on the shelf increments it instead of
//! inserting a second row.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use shelfwise_core::codes::batch_code;
use shelfwise_core::inventory::fifo_order;
use shelfwise_core::{CoreError, DiscountRate, Money, PriceInfo, ShelfBatch, WarehouseBatch};

const WAREHOUSE_COLUMNS: &str = r#"
    id, warehouse_id, product_id, batch_code, quantity,
    import_date, expiry_date, import_price
"#;

const SHELF_COLUMNS: &str = r#"
    id, shelf_id, product_id, batch_code, quantity, expiry_date,
    stocked_date, restocked_date, import_price, current_price,
    discount, is_near_expiry
"#;

/// A warehouse receipt before it has a code or an id.
#[derive(Debug, Clone)]
pub struct NewWarehouseBatch {
    pub warehouse_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub import_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub import_price: Money,
}

/// Units arriving on a shelf.
#[derive(Debug, Clone)]
pub struct ShelfStock {
    pub shelf_id: i64,
    pub product_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub date: NaiveDate,
    pub prices: PriceInfo,
}

// =============================================================================
// Reads on the pool
// =============================================================================

/// Repository for batch reads outside a transaction.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Every warehouse batch of a product, empty ones included, in FIFO order.
    pub async fn warehouse_batches(&self, product_id: i64) -> DbResult<Vec<WarehouseBatch>> {
        let sql = format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouse_batches WHERE product_id = ?1"
        );
        let mut rows = sqlx::query_as::<_, WarehouseBatch>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        fifo_order(&mut rows);
        Ok(rows)
    }

    pub async fn warehouse_batch(&self, id: i64) -> DbResult<Option<WarehouseBatch>> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouse_batches WHERE id = ?1");
        let row = sqlx::query_as::<_, WarehouseBatch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Shelf batches for one `(shelf, product)` pair, by id.
    pub async fn shelf_batches(&self, shelf_id: i64, product_id: i64) -> DbResult<Vec<ShelfBatch>> {
        let sql = format!(
            "SELECT {SHELF_COLUMNS} FROM shelf_batches WHERE shelf_id = ?1 AND product_id = ?2 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ShelfBatch>(&sql)
            .bind(shelf_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn shelf_batch(&self, id: i64) -> DbResult<Option<ShelfBatch>> {
        let sql = format!("SELECT {SHELF_COLUMNS} FROM shelf_batches WHERE id = ?1");
        let row = sqlx::query_as::<_, ShelfBatch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Units of a product across all warehouses.
    pub async fn warehouse_quantity(&self, product_id: i64) -> DbResult<i64> {
        let qty: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM warehouse_batches WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(qty)
    }

    /// Units of a product across all shelves.
    pub async fn shelf_quantity(&self, product_id: i64) -> DbResult<i64> {
        let qty: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM shelf_batches WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(qty)
    }

    /// Smallest quantity over every batch table. Used by invariant checks.
    pub async fn min_quantity(&self) -> DbResult<i64> {
        let min: i64 = sqlx::query_scalar(
            r#"
            SELECT MIN(q) FROM (
                SELECT COALESCE(MIN(quantity), 0) AS q FROM warehouse_batches
                UNION ALL
                SELECT COALESCE(MIN(quantity), 0) AS q FROM shelf_batches
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(min)
    }
}

// =============================================================================
// Warehouse batches (transactional)
// =============================================================================

/// Inserts a warehouse receipt coded by its import date.
pub async fn add_warehouse_batch(
    conn: &mut SqliteConnection,
    batch: &NewWarehouseBatch,
) -> DbResult<WarehouseBatch> {
    add_received_batch(conn, batch, batch.import_date).await
}

/// Inserts a warehouse receipt whose code carries the day it arrived.
///
/// The batch code is `BATCH{YYYYMMDD}{product:04}` for `received`; a second
/// receipt of the same product on the same day in the same warehouse gets
/// `-1`, then `-2`. The stored `import_date` may be earlier than `received`.
pub async fn add_received_batch(
    conn: &mut SqliteConnection,
    batch: &NewWarehouseBatch,
    received: NaiveDate,
) -> DbResult<WarehouseBatch> {
    if batch.quantity < 0 {
        return Err(CoreError::NegativeQuantity {
            field: "warehouse batch quantity".to_string(),
            value: batch.quantity,
        }
        .into());
    }

    let base = batch_code(received, batch.product_id, 0);
    let existing: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM warehouse_batches
        WHERE warehouse_id = ?1 AND product_id = ?2
          AND (batch_code = ?3 OR batch_code LIKE ?3 || '-%')
        "#,
    )
    .bind(batch.warehouse_id)
    .bind(batch.product_id)
    .bind(&base)
    .fetch_one(&mut *conn)
    .await?;
    let code = batch_code(received, batch.product_id, existing as u32);

    let sql = format!(
        r#"
        INSERT INTO warehouse_batches (
            warehouse_id, product_id, batch_code, quantity,
            import_date, expiry_date, import_price
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {WAREHOUSE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, WarehouseBatch>(&sql)
        .bind(batch.warehouse_id)
        .bind(batch.product_id)
        .bind(&code)
        .bind(batch.quantity)
        .bind(batch.import_date)
        .bind(batch.expiry_date)
        .bind(batch.import_price)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        batch_id = row.id,
        batch_code = %row.batch_code,
        product_id = row.product_id,
        quantity = row.quantity,
        "Added warehouse batch"
    );
    Ok(row)
}

/// Warehouse batches of a product that still hold stock, in FIFO order:
/// expiry ascending (no expiry last), then batch code, then id.
pub async fn fifo_warehouse_batches(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Vec<WarehouseBatch>> {
    let sql = format!(
        r#"
        SELECT {WAREHOUSE_COLUMNS} FROM warehouse_batches
        WHERE product_id = ?1 AND quantity > 0
        ORDER BY expiry_date IS NULL, expiry_date, batch_code, id
        "#
    );
    let rows = sqlx::query_as::<_, WarehouseBatch>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Removes `quantity` units from a warehouse batch, or fails without writing.
pub async fn consume_warehouse_batch(
    conn: &mut SqliteConnection,
    batch_id: i64,
    quantity: i64,
) -> DbResult<()> {
    guard_quantity(quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE warehouse_batches
        SET quantity = quantity - ?2
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM warehouse_batches WHERE id = ?1")
                .bind(batch_id)
                .fetch_optional(&mut *conn)
                .await?;
        return Err(match available {
            Some(available) => DbError::insufficient("warehouse_batch", batch_id, available, quantity),
            None => DbError::not_found("WarehouseBatch", batch_id),
        });
    }

    Ok(())
}

/// Sets every warehouse batch of a product to zero. Returns rows touched.
pub async fn zero_warehouse_stock(conn: &mut SqliteConnection, product_id: i64) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE warehouse_batches SET quantity = 0 WHERE product_id = ?1 AND quantity > 0",
    )
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Units of a product across all warehouses, read inside the caller's tx.
pub async fn warehouse_quantity(conn: &mut SqliteConnection, product_id: i64) -> DbResult<i64> {
    let qty: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM warehouse_batches WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(qty)
}

// =============================================================================
// Shelf batches (transactional)
// =============================================================================

/// Adds units to a shelf, merging into an existing row with the same code.
///
/// A merge bumps `quantity` and `restocked_date` and keeps the row's price
/// and markdown state; a fresh row starts undiscounted at `prices`.
pub async fn add_or_merge_shelf_batch(
    conn: &mut SqliteConnection,
    stock: &ShelfStock,
) -> DbResult<ShelfBatch> {
    if stock.quantity < 0 {
        return Err(CoreError::NegativeQuantity {
            field: "shelf batch quantity".to_string(),
            value: stock.quantity,
        }
        .into());
    }

    let sql = format!(
        r#"
        INSERT INTO shelf_batches (
            shelf_id, product_id, batch_code, quantity, expiry_date,
            stocked_date, restocked_date, import_price, current_price,
            discount, is_near_expiry
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, 0, 0)
        ON CONFLICT (shelf_id, product_id, batch_code) DO UPDATE SET
            quantity = shelf_batches.quantity + excluded.quantity,
            restocked_date = excluded.restocked_date
        RETURNING {SHELF_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ShelfBatch>(&sql)
        .bind(stock.shelf_id)
        .bind(stock.product_id)
        .bind(&stock.batch_code)
        .bind(stock.quantity)
        .bind(stock.expiry_date)
        .bind(stock.date)
        .bind(stock.prices.import_price)
        .bind(stock.prices.current_price)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        shelf_batch_id = row.id,
        batch_code = %row.batch_code,
        shelf_id = row.shelf_id,
        added = stock.quantity,
        quantity = row.quantity,
        "Stocked shelf batch"
    );
    Ok(row)
}

/// Removes `quantity` units from a shelf batch, or fails without writing.
///
/// ## Returns
/// The batch after the decrement.
pub async fn consume_shelf_batch(
    conn: &mut SqliteConnection,
    batch_id: i64,
    quantity: i64,
) -> DbResult<ShelfBatch> {
    guard_quantity(quantity)?;

    let sql = format!(
        r#"
        UPDATE shelf_batches
        SET quantity = quantity - ?2
        WHERE id = ?1 AND quantity >= ?2
        RETURNING {SHELF_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, ShelfBatch>(&sql)
        .bind(batch_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;

    match updated {
        Some(batch) => Ok(batch),
        None => {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM shelf_batches WHERE id = ?1")
                    .bind(batch_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            Err(match available {
                Some(available) => DbError::insufficient("shelf_batch", batch_id, available, quantity),
                None => DbError::not_found("ShelfBatch", batch_id),
            })
        }
    }
}

/// Every shelf batch with stock, by id.
pub async fn live_shelf_batches(conn: &mut SqliteConnection) -> DbResult<Vec<ShelfBatch>> {
    let sql = format!("SELECT {SHELF_COLUMNS} FROM shelf_batches WHERE quantity > 0 ORDER BY id");
    let rows = sqlx::query_as::<_, ShelfBatch>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Shelf batches for one `(shelf, product)` pair, read inside the caller's tx.
pub async fn shelf_batches_for_pair(
    conn: &mut SqliteConnection,
    shelf_id: i64,
    product_id: i64,
) -> DbResult<Vec<ShelfBatch>> {
    let sql = format!(
        "SELECT {SHELF_COLUMNS} FROM shelf_batches WHERE shelf_id = ?1 AND product_id = ?2 ORDER BY id"
    );
    let rows = sqlx::query_as::<_, ShelfBatch>(&sql)
        .bind(shelf_id)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Writes markdown state for a shelf batch.
pub async fn update_shelf_pricing(
    conn: &mut SqliteConnection,
    batch_id: i64,
    discount: DiscountRate,
    current_price: Money,
    is_near_expiry: bool,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE shelf_batches
        SET discount = ?2, current_price = ?3, is_near_expiry = ?4
        WHERE id = ?1
        "#,
    )
    .bind(batch_id)
    .bind(discount)
    .bind(current_price)
    .bind(is_near_expiry)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("ShelfBatch", batch_id));
    }
    Ok(())
}

/// Moves a shelf batch's expiry date. Used by end-of-run scenarios.
pub async fn set_shelf_batch_expiry(
    conn: &mut SqliteConnection,
    batch_id: i64,
    expiry: NaiveDate,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE shelf_batches SET expiry_date = ?2 WHERE id = ?1")
        .bind(batch_id)
        .bind(expiry)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("ShelfBatch", batch_id));
    }
    Ok(())
}

/// Zero is a no-op for callers, so it never reaches a guarded decrement.
fn guard_quantity(quantity: i64) -> DbResult<()> {
    if quantity <= 0 {
        return Err(CoreError::NegativeQuantity {
            field: "consumed quantity".to_string(),
            value: quantity,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

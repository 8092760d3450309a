//! # Order Repository
//!
//! Purchase order headers and detail lines.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shelfwise_core::{Money, OrderStatus, PurchaseOrder, PurchaseOrderDetail};

const ORDER_COLUMNS: &str = r#"
    id, order_no, supplier_id, employee_id, order_date,
    delivery_date, status, total_amount
"#;

/// Header values for a new order.
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub order_no: String,
    pub supplier_id: i64,
    pub employee_id: i64,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub total_amount: Money,
}

pub async fn insert_order(
    conn: &mut SqliteConnection,
    order: &NewPurchaseOrder,
) -> DbResult<PurchaseOrder> {
    let sql = format!(
        r#"
        INSERT INTO purchase_orders (
            order_no, supplier_id, employee_id, order_date,
            delivery_date, status, total_amount
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PurchaseOrder>(&sql)
        .bind(&order.order_no)
        .bind(order.supplier_id)
        .bind(order.employee_id)
        .bind(order.order_date)
        .bind(order.delivery_date)
        .bind(order.status)
        .bind(order.total_amount)
        .fetch_one(&mut *conn)
        .await?;

    debug!(order_no = %row.order_no, total = %row.total_amount, "Inserted purchase order");
    Ok(row)
}

pub async fn insert_order_detail(
    conn: &mut SqliteConnection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: Money,
) -> DbResult<PurchaseOrderDetail> {
    let row = sqlx::query_as::<_, PurchaseOrderDetail>(
        r#"
        INSERT INTO purchase_order_details (order_id, product_id, quantity, unit_price, subtotal)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, order_id, product_id, quantity, unit_price, subtotal
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(unit_price.multiply_quantity(quantity))
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_no(&self, order_no: &str) -> DbResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE order_no = ?1");
        let row = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(order_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn details(&self, order_id: i64) -> DbResult<Vec<PurchaseOrderDetail>> {
        let rows = sqlx::query_as::<_, PurchaseOrderDetail>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, subtotal
            FROM purchase_order_details
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Orders dated within `[start, end]`.
    pub async fn list_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE order_date BETWEEN ?1 AND ?2 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

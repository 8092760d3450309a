//! # Invoice Repository
//!
//! Sales invoice headers and detail lines. The header is written after all
//! lines are known, so `subtotal` always equals the detail sum.

use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shelfwise_core::{InvoiceLine, InvoiceTotals, PaymentMethod, SalesInvoice, SalesInvoiceDetail};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_no, customer_id, employee_id, invoice_date, subtotal,
    discount_amount, tax_amount, total_amount, points_earned, points_used, payment_method
"#;

const DETAIL_COLUMNS: &str = r#"
    id, invoice_id, product_id, shelf_batch_id, batch_code,
    quantity, unit_price, discount, subtotal
"#;

#[derive(Debug, Clone)]
pub struct NewSalesInvoice {
    pub invoice_no: String,
    pub customer_id: Option<i64>,
    pub employee_id: i64,
    pub invoice_date: NaiveDateTime,
    pub totals: InvoiceTotals,
    pub points_earned: i64,
    pub points_used: i64,
    pub payment_method: PaymentMethod,
}

pub async fn insert_invoice(
    conn: &mut SqliteConnection,
    invoice: &NewSalesInvoice,
) -> DbResult<SalesInvoice> {
    let sql = format!(
        r#"
        INSERT INTO sales_invoices (
            invoice_no, customer_id, employee_id, invoice_date, subtotal,
            discount_amount, tax_amount, total_amount, points_earned, points_used,
            payment_method
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING {INVOICE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, SalesInvoice>(&sql)
        .bind(&invoice.invoice_no)
        .bind(invoice.customer_id)
        .bind(invoice.employee_id)
        .bind(invoice.invoice_date)
        .bind(invoice.totals.subtotal)
        .bind(invoice.totals.discount_amount)
        .bind(invoice.totals.tax_amount)
        .bind(invoice.totals.total_amount)
        .bind(invoice.points_earned)
        .bind(invoice.points_used)
        .bind(invoice.payment_method)
        .fetch_one(&mut *conn)
        .await?;

    debug!(invoice_no = %row.invoice_no, total = %row.total_amount, "Inserted invoice");
    Ok(row)
}

pub async fn insert_invoice_detail(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    line: &InvoiceLine,
) -> DbResult<SalesInvoiceDetail> {
    let sql = format!(
        r#"
        INSERT INTO sales_invoice_details (
            invoice_id, product_id, shelf_batch_id, batch_code,
            quantity, unit_price, discount, subtotal
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING {DETAIL_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, SalesInvoiceDetail>(&sql)
        .bind(invoice_id)
        .bind(line.product_id)
        .bind(line.shelf_batch_id)
        .bind(&line.batch_code)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount)
        .bind(line.subtotal())
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// Repository for invoice reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_no(&self, invoice_no: &str) -> DbResult<Option<SalesInvoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM sales_invoices WHERE invoice_no = ?1");
        let row = sqlx::query_as::<_, SalesInvoice>(&sql)
            .bind(invoice_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn all(&self) -> DbResult<Vec<SalesInvoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM sales_invoices ORDER BY id");
        let rows = sqlx::query_as::<_, SalesInvoice>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn details(&self, invoice_id: i64) -> DbResult<Vec<SalesInvoiceDetail>> {
        let sql = format!(
            "SELECT {DETAIL_COLUMNS} FROM sales_invoice_details WHERE invoice_id = ?1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, SalesInvoiceDetail>(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

//! # Customer Repository
//!
//! Loyalty members. Spending and points only move through [`accrue`].

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use shelfwise_core::{Customer, Money};

const CUSTOMER_COLUMNS: &str = r#"
    id, customer_code, full_name, membership_level_id,
    total_spending, loyalty_points, is_active
"#;

/// Adds a paid total and earned points to a member.
pub async fn accrue(
    conn: &mut SqliteConnection,
    customer_id: i64,
    spent: Money,
    points: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET total_spending = total_spending + ?2,
            loyalty_points = loyalty_points + ?3
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(spent.max(Money::zero()))
    .bind(points.max(0))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }
    Ok(())
}

/// Repository for customer reads.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Active members, by id.
    pub async fn active(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE is_active = 1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let row = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_master_data;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_accrue_adds_spending_and_points() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let member = db.customers().active().await.unwrap()[0].clone();

        let mut tx = db.begin().await.unwrap();
        accrue(&mut tx, member.id, Money::from_units(66_000), 6).await.unwrap();
        tx.commit().await.unwrap();

        let after = db.customers().get(member.id).await.unwrap().unwrap();
        assert_eq!(after.total_spending, member.total_spending + Money::from_units(66_000));
        assert_eq!(after.loyalty_points, member.loyalty_points + 6);
    }

    #[tokio::test]
    async fn test_accrue_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        assert!(matches!(
            accrue(&mut tx, 404, Money::from_units(1), 0).await,
            Err(DbError::NotFound { .. })
        ));
    }
}

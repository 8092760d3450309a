//! # Discount Rule Repository

use sqlx::SqlitePool;

use crate::error::DbResult;
use shelfwise_core::DiscountRule;

#[derive(Debug, Clone)]
pub struct DiscountRuleRepository {
    pool: SqlitePool,
}

impl DiscountRuleRepository {
    /// Creates a new DiscountRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRuleRepository { pool }
    }

    /// Active rules, ordered by category then threshold.
    pub async fn active(&self) -> DbResult<Vec<DiscountRule>> {
        let rows = sqlx::query_as::<_, DiscountRule>(
            r#"
            SELECT id, category_id, days_before_expiry, discount, rule_name, is_active
            FROM discount_rules
            WHERE is_active = 1
            ORDER BY category_id, days_before_expiry
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

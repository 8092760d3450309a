//! # Catalog Repository
//!
//! Read access to master data, plus the one master-data write the engine
//! performs itself: shelf layout slots.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use shelfwise_core::{
    Category, DisplayShelf, Employee, EmployeeRole, Product, ShelfLayout, Supplier, Warehouse,
};

const PRODUCT_COLUMNS: &str = r#"
    id, product_code, name, category_id, supplier_id, unit,
    import_price, selling_price, shelf_life_days, low_stock_threshold, is_active
"#;

/// Repository for master records.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Active products, by id.
    pub async fn products(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Gets a product by id, active or not.
    pub async fn product(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Counts every product row.
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn categories(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM product_categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn suppliers(&self) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, supplier_code, name, is_active
            FROM suppliers
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn warehouses(&self) -> DbResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, Warehouse>(
            "SELECT id, warehouse_code, name FROM warehouses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active shelves ordered by id, so "first shelf of a category" is stable.
    pub async fn shelves(&self) -> DbResult<Vec<DisplayShelf>> {
        let rows = sqlx::query_as::<_, DisplayShelf>(
            r#"
            SELECT id, shelf_code, name, category_id, is_active
            FROM display_shelves
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn employees(&self) -> DbResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, full_name, role, is_active
            FROM employees
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active employees holding `role`.
    pub async fn employees_with_role(&self, role: EmployeeRole) -> DbResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, full_name, role, is_active
            FROM employees
            WHERE is_active = 1 AND role = ?1
            ORDER BY id
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn layouts(&self) -> DbResult<Vec<ShelfLayout>> {
        let rows = sqlx::query_as::<_, ShelfLayout>(
            r#"
            SELECT id, shelf_id, product_id, position_code, max_quantity
            FROM shelf_layouts
            ORDER BY shelf_id, position_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Creates a layout slot for `(shelf, product)` unless one exists.
    ///
    /// ## Returns
    /// `true` when a row was inserted.
    pub async fn ensure_layout(
        &self,
        shelf_id: i64,
        product_id: i64,
        position_code: &str,
        max_quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO shelf_layouts (shelf_id, product_id, position_code, max_quantity)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (shelf_id, product_id) DO NOTHING
            "#,
        )
        .bind(shelf_id)
        .bind(product_id)
        .bind(position_code)
        .bind(max_quantity)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            debug!(shelf_id, product_id, position = %position_code, "Created shelf layout");
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use crate::seed::seed_master_data;
    use crate::{Database, DbConfig};
    use shelfwise_core::EmployeeRole;

    #[tokio::test]
    async fn test_seeded_catalog_reads() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let catalog = db.catalog();

        let products = catalog.products().await.unwrap();
        assert!(!products.is_empty());
        assert_eq!(catalog.count_products().await.unwrap(), products.len() as i64);
        assert!(products.iter().all(|p| p.selling_price > p.import_price));

        let first = catalog.product(products[0].id).await.unwrap().unwrap();
        assert_eq!(first.product_code, products[0].product_code);

        let warehouse_staff = catalog
            .employees_with_role(EmployeeRole::Warehouse)
            .await
            .unwrap();
        assert!(!warehouse_staff.is_empty());
        assert!(warehouse_staff.iter().all(|e| e.role == EmployeeRole::Warehouse));
    }

    #[tokio::test]
    async fn test_ensure_layout_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let catalog = db.catalog();
        let shelf = catalog.shelves().await.unwrap()[0].clone();
        let product = catalog.products().await.unwrap()[0].clone();

        assert!(catalog.ensure_layout(shelf.id, product.id, "P01", 200).await.unwrap());
        assert!(!catalog.ensure_layout(shelf.id, product.id, "P01", 200).await.unwrap());
        assert_eq!(catalog.layouts().await.unwrap().len(), 1);
    }
}

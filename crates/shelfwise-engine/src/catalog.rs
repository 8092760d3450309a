//! # Catalog Snapshot
//!
//! Master data read once at the start of a run. The controller and the
//! executors resolve shelves, warehouses, and staff from here rather than
//! going back to the database on every step.
//!
//! ## Resolution Rules
//! ```text
//! product ──► category ──► first active shelf of that category
//!
//! purchase orders   ──► manager, else supervisor
//! stock transfers   ──► warehouse staff
//! sales invoices    ──► any cashier (drawn per invoice)
//! ```
//!
//! Anything missing here is a configuration problem and aborts the run.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::error::EngineResult;
use shelfwise_core::validation::validate_product;
use shelfwise_core::{
    Category, CoreError, Customer, DiscountRule, DisplayShelf, Employee, EmployeeRole, Product,
    Supplier, Warehouse, DEFAULT_LAYOUT_MAX_QUANTITY,
};
use shelfwise_db::Database;

/// Read-only view of master data for one run.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub suppliers: Vec<Supplier>,
    pub warehouse: Warehouse,
    pub shelves: Vec<DisplayShelf>,
    pub customers: Vec<Customer>,
    pub discount_rules: Vec<DiscountRule>,
    order_employee: Employee,
    transfer_employee: Employee,
    cashiers: Vec<Employee>,
    shelf_by_category: HashMap<i64, i64>,
}

impl CatalogSnapshot {
    /// Loads and checks master data.
    ///
    /// ## Errors
    /// `CoreError::Configuration` when there are no products, no warehouse,
    /// a product whose category has no active shelf, or a role nobody holds.
    pub async fn load(db: &Database) -> EngineResult<Self> {
        let catalog = db.catalog();

        let products = catalog.products().await?;
        if products.is_empty() {
            return Err(missing("no active products; seed master data first"));
        }
        for product in &products {
            validate_product(product)?;
        }

        let categories = catalog.categories().await?;
        let suppliers = catalog.suppliers().await?;
        let warehouse = catalog
            .warehouses()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| missing("no warehouse defined"))?;
        let shelves = catalog.shelves().await?;

        let mut shelf_by_category = HashMap::new();
        for shelf in &shelves {
            shelf_by_category.entry(shelf.category_id).or_insert(shelf.id);
        }
        for product in &products {
            if !shelf_by_category.contains_key(&product.category_id) {
                return Err(missing(&format!(
                    "product {} (category {}) has no active display shelf",
                    product.product_code, product.category_id
                )));
            }
        }

        let employees = catalog.employees().await?;
        let first_with = |roles: &[EmployeeRole]| {
            roles.iter().find_map(|role| employees.iter().find(|e| e.role == *role).cloned())
        };
        let order_employee = first_with(&[EmployeeRole::Manager, EmployeeRole::Supervisor])
            .ok_or_else(|| missing("no manager or supervisor to sign purchase orders"))?;
        let transfer_employee = first_with(&[EmployeeRole::Warehouse])
            .ok_or_else(|| missing("no warehouse employee to perform transfers"))?;
        let cashiers: Vec<Employee> = employees
            .iter()
            .filter(|e| e.role == EmployeeRole::Cashier)
            .cloned()
            .collect();
        if cashiers.is_empty() {
            return Err(missing("no cashier to ring up sales"));
        }

        let customers = db.customers().active().await?;
        let discount_rules = db.discount_rules().active().await?;

        info!(
            products = products.len(),
            shelves = shelves.len(),
            customers = customers.len(),
            discount_rules = discount_rules.len(),
            "Loaded catalog snapshot"
        );

        Ok(CatalogSnapshot {
            products,
            categories,
            suppliers,
            warehouse,
            shelves,
            customers,
            discount_rules,
            order_employee,
            transfer_employee,
            cashiers,
            shelf_by_category,
        })
    }

    pub fn product(&self, product_id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Display shelf a product is stocked on.
    pub fn shelf_for(&self, product: &Product) -> EngineResult<i64> {
        self.shelf_by_category
            .get(&product.category_id)
            .copied()
            .ok_or_else(|| {
                missing(&format!("no shelf for category {}", product.category_id))
            })
    }

    pub fn order_employee(&self) -> &Employee {
        &self.order_employee
    }

    pub fn transfer_employee(&self) -> &Employee {
        &self.transfer_employee
    }

    pub fn cashiers(&self) -> &[Employee] {
        &self.cashiers
    }

    /// A cashier for one invoice.
    pub fn draw_cashier<R: Rng + ?Sized>(&self, rng: &mut R) -> &Employee {
        // `load` guarantees at least one cashier.
        self.cashiers.choose(rng).unwrap_or(&self.order_employee)
    }

    /// Products grouped by supplier, in supplier order.
    pub fn products_by_supplier(&self) -> Vec<(i64, Vec<&Product>)> {
        let mut groups: Vec<(i64, Vec<&Product>)> = Vec::new();
        for product in &self.products {
            match groups.iter_mut().find(|(id, _)| *id == product.supplier_id) {
                Some((_, list)) => list.push(product),
                None => groups.push((product.supplier_id, vec![product])),
            }
        }
        groups.sort_by_key(|(id, _)| *id);
        groups
    }

    /// `(product_id, category_id)` pairs for drawing daily targets.
    pub fn product_categories(&self) -> Vec<(i64, i64)> {
        self.products.iter().map(|p| (p.id, p.category_id)).collect()
    }

    /// Gives every product a layout slot on its shelf. Existing slots are
    /// left alone.
    ///
    /// ## Returns
    /// Number of slots created.
    pub async fn ensure_layouts(&self, db: &Database) -> EngineResult<usize> {
        let catalog = db.catalog();
        let mut positions: HashMap<i64, usize> = HashMap::new();
        let mut created = 0;

        for product in &self.products {
            let shelf_id = self.shelf_for(product)?;
            let slot = positions.entry(shelf_id).or_insert(0);
            *slot += 1;
            let position = format!("P{:02}", slot);
            if catalog
                .ensure_layout(shelf_id, product.id, &position, DEFAULT_LAYOUT_MAX_QUANTITY)
                .await?
            {
                created += 1;
            }
        }

        debug!(created, "Ensured shelf layouts");
        Ok(created)
    }
}

fn missing(what: &str) -> crate::error::EngineError {
    CoreError::Configuration(what.to_string()).into()
}

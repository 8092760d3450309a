//! # Master Data Seeding
//!
//! Populates an empty database with a small but complete store: categories,
//! suppliers, one warehouse, a shelf per category, staff for every role,
//! membership levels, members, products and markdown rules.
//!
//! ## Category Order
//! ```text
//! id 1  Fresh Food      high volume   short shelf life
//! id 2  Beverages       high volume
//! id 3  Electronics     low volume    no expiry
//! id 4  Household       medium volume
//! id 5  Personal Care   medium volume
//! ```
//!
//! Default demand bands key off these ids, so the insert order matters.
//!
//! Seeding is all-or-nothing and refuses to run twice: if any product exists
//! the call returns a report with `skipped = true`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use shelfwise_core::validation::{validate_discount_rule, validate_product};
use shelfwise_core::{CoreError, DiscountRate, DiscountRule, EmployeeRole, Money, Product};

/// Category name, shelf life range in days (`None` = never expires),
/// low-stock threshold, product names.
struct CategorySeed {
    name: &'static str,
    code: &'static str,
    shelf_life: Option<(i64, i64)>,
    low_stock_threshold: i64,
    unit: &'static str,
    products: &'static [&'static str],
}

const CATEGORIES: &[CategorySeed] = &[
    CategorySeed {
        name: "Fresh Food",
        code: "FOOD",
        shelf_life: Some((6, 21)),
        low_stock_threshold: 20,
        unit: "pack",
        products: &[
            "Fresh Milk 1L",
            "Greek Yogurt",
            "Sliced Bread",
            "Chicken Breast",
            "Pork Sausage",
            "Tofu",
            "Cheddar Cheese",
            "Eggs 10pc",
        ],
    },
    CategorySeed {
        name: "Beverages",
        code: "BEV",
        shelf_life: Some((90, 365)),
        low_stock_threshold: 30,
        unit: "can",
        products: &[
            "Cola 330ml",
            "Lemon Tea",
            "Mineral Water 500ml",
            "Orange Juice 1L",
            "Iced Coffee",
            "Energy Drink",
        ],
    },
    CategorySeed {
        name: "Electronics",
        code: "ELEC",
        shelf_life: None,
        low_stock_threshold: 3,
        unit: "piece",
        products: &["USB-C Cable", "AA Batteries 4pc", "Earphones", "Power Bank"],
    },
    CategorySeed {
        name: "Household",
        code: "HOME",
        shelf_life: Some((365, 730)),
        low_stock_threshold: 10,
        unit: "bottle",
        products: &["Dish Soap", "Laundry Powder", "Paper Towels", "Trash Bags"],
    },
    CategorySeed {
        name: "Personal Care",
        code: "CARE",
        shelf_life: Some((180, 540)),
        low_stock_threshold: 10,
        unit: "tube",
        products: &["Toothpaste", "Shampoo", "Body Wash", "Hand Cream"],
    },
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("SUP-FRESH", "Green Valley Farms"),
    ("SUP-DRINK", "Riverside Beverages"),
    ("SUP-GOODS", "Metro Wholesale"),
];

const EMPLOYEES: &[(&str, &str, EmployeeRole)] = &[
    ("EMP-001", "Lan Nguyen", EmployeeRole::Manager),
    ("EMP-002", "Minh Tran", EmployeeRole::Supervisor),
    ("EMP-003", "Hoa Le", EmployeeRole::Cashier),
    ("EMP-004", "Tuan Pham", EmployeeRole::Cashier),
    ("EMP-005", "Quang Vo", EmployeeRole::Warehouse),
    ("EMP-006", "Thu Dang", EmployeeRole::Warehouse),
];

const MEMBERSHIP_LEVELS: &[(&str, i64)] = &[("Bronze", 0), ("Silver", 5_000_000), ("Gold", 20_000_000)];

/// `(category index, days_before_expiry, percent)`.
const DISCOUNT_RULES: &[(usize, i64, u32)] = &[
    (0, 5, 50),
    (0, 15, 20),
    (1, 5, 50),
    (1, 15, 20),
    (1, 30, 10),
    (3, 30, 10),
    (4, 30, 10),
];

/// Knobs for [`seed_master_data_with`].
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub customers: usize,
    pub rng_seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            customers: 30,
            rng_seed: 7,
        }
    }
}

/// Rows written by a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub skipped: bool,
    pub categories: usize,
    pub suppliers: usize,
    pub shelves: usize,
    pub employees: usize,
    pub customers: usize,
    pub products: usize,
    pub discount_rules: usize,
}

/// Seeds master data with default options.
pub async fn seed_master_data(db: &Database) -> DbResult<SeedReport> {
    seed_master_data_with(db, &SeedOptions::default()).await
}

pub async fn seed_master_data_with(db: &Database, options: &SeedOptions) -> DbResult<SeedReport> {
    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        info!(existing, "Products already present, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    let mut rng = StdRng::seed_from_u64(options.rng_seed);
    let mut report = SeedReport::default();
    let mut tx = db.begin().await?;

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for category in CATEGORIES {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO product_categories (name) VALUES (?1) RETURNING id",
        )
        .bind(category.name)
        .fetch_one(&mut *tx)
        .await?;
        category_ids.push(id);
    }
    report.categories = category_ids.len();

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (code, name) in SUPPLIERS {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO suppliers (supplier_code, name) VALUES (?1, ?2) RETURNING id",
        )
        .bind(code)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        supplier_ids.push(id);
    }
    report.suppliers = supplier_ids.len();

    sqlx::query("INSERT INTO warehouses (warehouse_code, name) VALUES ('WH-MAIN', 'Main Warehouse')")
        .execute(&mut *tx)
        .await?;

    for (category, category_id) in CATEGORIES.iter().zip(&category_ids) {
        sqlx::query(
            "INSERT INTO display_shelves (shelf_code, name, category_id) VALUES (?1, ?2, ?3)",
        )
        .bind(format!("SH-{}", category.code))
        .bind(format!("{} Shelf", category.name))
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        report.shelves += 1;
    }

    for (code, name, role) in EMPLOYEES {
        sqlx::query("INSERT INTO employees (employee_code, full_name, role) VALUES (?1, ?2, ?3)")
            .bind(code)
            .bind(name)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        report.employees += 1;
    }

    let mut level_ids = Vec::with_capacity(MEMBERSHIP_LEVELS.len());
    for (name, min_spending) in MEMBERSHIP_LEVELS {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO membership_levels (name, min_spending) VALUES (?1, ?2) RETURNING id",
        )
        .bind(name)
        .bind(min_spending)
        .fetch_one(&mut *tx)
        .await?;
        level_ids.push(id);
    }

    for n in 1..=options.customers {
        sqlx::query(
            "INSERT INTO customers (customer_code, full_name, membership_level_id) VALUES (?1, ?2, ?3)",
        )
        .bind(format!("CUS-{n:04}"))
        .bind(format!("Member {n}"))
        .bind(level_ids.first().copied())
        .execute(&mut *tx)
        .await?;
        report.customers += 1;
    }

    for (index, (category, category_id)) in CATEGORIES.iter().zip(&category_ids).enumerate() {
        let supplier_id = supplier_ids[index.min(supplier_ids.len() - 1)];
        for (n, name) in category.products.iter().enumerate() {
            let product = generate_product(&mut rng, category, *category_id, supplier_id, n, name);
            validate_product(&product).map_err(CoreError::from)?;
            insert_product(&mut tx, &product).await?;
            report.products += 1;
        }
    }

    for (category_index, days, percent) in DISCOUNT_RULES {
        let rule = DiscountRule {
            id: 0,
            category_id: category_ids[*category_index],
            days_before_expiry: *days,
            discount: DiscountRate::from_percent(*percent),
            rule_name: Some(format!("{percent}% off within {days} days")),
            is_active: true,
        };
        validate_discount_rule(&rule).map_err(CoreError::from)?;
        sqlx::query(
            r#"
            INSERT INTO discount_rules (category_id, days_before_expiry, discount, rule_name)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(rule.category_id)
        .bind(rule.days_before_expiry)
        .bind(rule.discount)
        .bind(&rule.rule_name)
        .execute(&mut *tx)
        .await?;
        report.discount_rules += 1;
    }

    tx.commit().await?;

    info!(
        categories = report.categories,
        products = report.products,
        customers = report.customers,
        "Seeded master data"
    );
    Ok(report)
}

/// Prices are whole thousands of dong; selling is 20 to 50 percent over cost.
fn generate_product(
    rng: &mut StdRng,
    category: &CategorySeed,
    category_id: i64,
    supplier_id: i64,
    n: usize,
    name: &str,
) -> Product {
    let import_thousands: i64 = rng.gen_range(8..=150);
    let markup: i64 = rng.gen_range(120..=150);
    let import_price = Money::from_units(import_thousands * 1_000);
    let selling_price = Money::from_units((import_thousands * markup / 100).max(import_thousands + 1) * 1_000);

    Product {
        id: 0,
        product_code: format!("{}-{:03}", category.code, n + 1),
        name: name.to_string(),
        category_id,
        supplier_id,
        unit: category.unit.to_string(),
        import_price,
        selling_price,
        shelf_life_days: category.shelf_life.map(|(lo, hi)| rng.gen_range(lo..=hi)),
        low_stock_threshold: category.low_stock_threshold,
        is_active: true,
    }
}

async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            product_code, name, category_id, supplier_id, unit, import_price,
            selling_price, shelf_life_days, low_stock_threshold
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&product.product_code)
    .bind(&product.name)
    .bind(product.category_id)
    .bind(product.supplier_id)
    .bind(&product.unit)
    .bind(product.import_price)
    .bind(product.selling_price)
    .bind(product.shelf_life_days)
    .bind(product.low_stock_threshold)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

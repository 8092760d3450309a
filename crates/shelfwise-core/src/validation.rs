//! # Validation Module
//!
//! Checks applied to master data and run parameters before they reach the
//! store or the control loop.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Engine config (TOML / env / CLI)                              │
//! │  └── validate_date_range, validate_tax_rate_bps                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, called by seeding and the catalog snapshot       │
//! │  ├── validate_product        selling > import > 0                       │
//! │  └── validate_discount_rule  0..=10000 bps                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity >= 0)                                              │
//! │  ├── UNIQUE (shelf_id, product_id, batch_code)                          │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{DiscountRate, DiscountRule, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business code (`product_code`, `shelf_code`, ...).
///
/// ## Example
/// ```rust
/// use shelfwise_core::validation::validate_code;
///
/// assert!(validate_code("product_code", "SP0001").is_ok());
/// assert!(validate_code("product_code", "").is_err());
/// assert!(validate_code("product_code", "has space").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a product's pricing and thresholds.
///
/// ## Rules
/// - `product_code` and `name` present
/// - `import_price > 0`
/// - `selling_price > import_price`
/// - `shelf_life_days`, when set, is positive
/// - `low_stock_threshold >= 0`
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_code("product_code", &product.product_code)?;

    if product.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if !product.import_price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "import_price".to_string(),
        });
    }

    if product.selling_price <= product.import_price {
        return Err(ValidationError::MustExceed {
            field: "selling_price".to_string(),
            other: "import_price".to_string(),
        });
    }

    if matches!(product.shelf_life_days, Some(days) if days <= 0) {
        return Err(ValidationError::MustBePositive {
            field: "shelf_life_days".to_string(),
        });
    }

    validate_non_negative("low_stock_threshold", product.low_stock_threshold)
}

/// Validates a discount rule: threshold non-negative, rate within 0..=100%.
pub fn validate_discount_rule(rule: &DiscountRule) -> ValidationResult<()> {
    validate_non_negative("days_before_expiry", rule.days_before_expiry)?;

    if rule.discount.bps() > DiscountRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: DiscountRate::MAX_BPS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a document line quantity (must be positive).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Rejects negative stock figures.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

/// Validates a percentage in 0..=100.
pub fn validate_percent(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=100).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates a simulation window: `end >= start`.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if end < start {
        return Err(ValidationError::InvalidFormat {
            field: "end_date".to_string(),
            reason: format!("{end} is before start date {start}"),
        });
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

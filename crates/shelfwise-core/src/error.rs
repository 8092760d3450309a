//! # Error Types
//!
//! Domain-specific error types for shelfwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelfwise-core errors (this file)                                     │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shelfwise-db errors                                                   │
//! │  └── DbError          - Storage failures (wraps CoreError)             │
//! │                                                                         │
//! │  shelfwise-engine errors                                               │
//! │  └── EngineError      - What the controller and driver see             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → driver    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fatal vs. Recoverable
//! `InsufficientStock` and `NoFulfillableLineItems` abort one transaction and
//! the control loop moves on. `Configuration` aborts the whole run.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested consumption exceeds what a batch (or product) holds.
    ///
    /// ## When This Occurs
    /// - Transfer asks for more than the FIFO-selected warehouse batch holds
    /// - A guarded decrement finds `quantity < requested`
    /// - A product has no warehouse stock at all
    ///
    /// ## Effect
    /// ```text
    /// transfer(P, shelf, 15)
    ///      │
    ///      ▼
    /// FIFO batch holds 10
    ///      │
    ///      ▼
    /// InsufficientStock { entity: "warehouse_batch", available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// transaction dropped → nothing written, controller logs and continues
    /// ```
    #[error("Insufficient stock in {entity} {id}: available {available}, requested {requested}")]
    InsufficientStock {
        entity: String,
        id: String,
        available: i64,
        requested: i64,
    },

    /// A synthesized sale could not place a single line item.
    ///
    /// ## When This Occurs
    /// - Every line draw hit a batch that was drained earlier in the invoice
    /// - No shelf batch anywhere has stock
    #[error("No line items could be fulfilled for invoice {invoice_no}")]
    NoFulfillableLineItems { invoice_no: String },

    /// A quantity argument was negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeQuantity { field: String, value: i64 },

    /// Missing master data or unusable settings. Fatal for a run.
    ///
    /// ## When This Occurs
    /// - No products, no shelf for a product's category
    /// - No employee with the required role
    /// - Unparseable dates or an inverted date range
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for `InsufficientStock`.
    pub fn insufficient(
        entity: impl Into<String>,
        id: impl ToString,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            entity: entity.into(),
            id: id.to_string(),
            available,
            requested,
        }
    }

    /// True for errors that abort one transaction but not the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. } | CoreError::NoFulfillableLineItems { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// One value must exceed another (selling price over import price).
    #[error("{field} must be greater than {other}")]
    MustExceed { field: String, other: String },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::insufficient("warehouse_batch", 7, 10, 15);
        assert_eq!(
            err.to_string(),
            "Insufficient stock in warehouse_batch 7: available 10, requested 15"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CoreError::insufficient("shelf_batch", 1, 0, 1).is_recoverable());
        assert!(CoreError::NoFulfillableLineItems {
            invoice_no: "INV2025090001".into()
        }
        .is_recoverable());
        assert!(!CoreError::Configuration("no products".into()).is_recoverable());
        assert!(!CoreError::NegativeQuantity {
            field: "quantity".into(),
            value: -1
        }
        .is_recoverable());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product_code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

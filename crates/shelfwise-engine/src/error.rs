//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Database     │  │       Domain            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Config         │  │  Database       │  │  InsufficientStock  ◄── │ │
//! │  │  Io             │  │  (DbError,      │  │  NoFulfillableLineItems │ │
//! │  │  TomlParse      │  │   may carry a   │  │  NegativeQuantity       │ │
//! │  │  Json           │  │   CoreError)    │  │  Configuration          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ◄── recoverable: the controller logs a warning and moves on           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shelfwise_core::{CoreError, ValidationError};
use shelfwise_db::DbError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unusable settings or missing master data. Fatal.
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to render summary: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl EngineError {
    /// True for failures that abort one transaction but not the run:
    /// insufficient stock and invoices with no fulfillable lines.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Domain(err) => err.is_recoverable(),
            EngineError::Database(err) => err.is_recoverable(),
            _ => false,
        }
    }

    /// True for errors that mean the run was misconfigured.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::Config(_)
                | EngineError::TomlParse(_)
                | EngineError::Domain(CoreError::Configuration(_))
                | EngineError::Domain(CoreError::Validation(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        let stock = CoreError::insufficient("warehouse_batch", "BATCH202509010001", 10, 15);
        assert!(EngineError::from(stock).is_recoverable());

        let wrapped = DbError::insufficient("shelf_batch", 4, 0, 1);
        assert!(EngineError::from(wrapped).is_recoverable());

        let empty = CoreError::NoFulfillableLineItems {
            invoice_no: "INV2025090001".into(),
        };
        assert!(EngineError::from(empty).is_recoverable());

        assert!(!EngineError::Config("no cashier".into()).is_recoverable());
        assert!(!EngineError::Database(DbError::Internal("boom".into())).is_recoverable());
    }

    #[test]
    fn test_config_errors() {
        assert!(EngineError::Config("bad".into()).is_config_error());
        assert!(EngineError::from(CoreError::Configuration("no shelf".into())).is_config_error());
        assert!(!EngineError::from(CoreError::insufficient("warehouse", 1, 0, 1)).is_config_error());
    }
}

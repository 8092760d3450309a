//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority, applied by `simulate`)        │
//! │     --start 2025-09-01 --end 2025-09-30 --rng-seed 42                   │
//! │                                                                         │
//! │  2. Environment Variables                                               │
//! │     SHELFWISE_DB=./store.db                                             │
//! │     SHELFWISE_TRANSFER_POLICY=span_batches                              │
//! │                                                                         │
//! │  3. TOML Config File                                                    │
//! │     --config <path>, or                                                 │
//! │     ~/.config/shelfwise/engine.toml (Linux)                             │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./shelfwise.db"
//!
//! [simulation]
//! start_date = "2025-09-01"
//! end_date = "2025-09-30"
//! rng_seed = 42
//! transfer_policy = "single_batch"
//!
//! [demand]
//! high_volume_categories = [1, 2]
//! low_volume_categories = [3]
//! high = { min = 15, max = 34 }
//!
//! [sales]
//! min_customers = 20
//! max_customers = 50
//! member_percent = 70
//!
//! [discount]
//! window_days = 30
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use shelfwise_core::expiry::ExpiryPolicy;
use shelfwise_core::replenishment::{DemandProfile, ReplenishmentPolicy, UnitBand};
use shelfwise_core::validation::{
    parse_date, validate_date_range, validate_percent, validate_tax_rate_bps,
};
use shelfwise_core::{AllocationPolicy, TaxRate};
use shelfwise_db::DbConfig;

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `:memory:` runs against a throwaway store.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelfwise.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    pub fn db_config(&self) -> DbConfig {
        if self.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.path).max_connections(self.max_connections)
        }
    }
}

// =============================================================================
// Simulation
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// First simulated day (the stocking day).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Last simulated day, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Fixed seed for reproducible runs. `None` seeds from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Delete prior simulation output before running.
    #[serde(default)]
    pub clear: bool,

    /// Seed master data when the product table is empty.
    #[serde(default)]
    pub seed_master_data: bool,

    /// How restock transfers draw from warehouse batches.
    #[serde(default)]
    pub transfer_policy: AllocationPolicy,
}

// =============================================================================
// Demand / Replenishment
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandSettings {
    #[serde(default = "default_high_categories")]
    pub high_volume_categories: Vec<i64>,

    #[serde(default = "default_low_categories")]
    pub low_volume_categories: Vec<i64>,

    #[serde(default = "default_high_band")]
    pub high: UnitBand,

    #[serde(default = "default_medium_band")]
    pub medium: UnitBand,

    #[serde(default = "default_low_band")]
    pub low: UnitBand,
}

fn default_high_categories() -> Vec<i64> {
    vec![1, 2]
}
fn default_low_categories() -> Vec<i64> {
    vec![3]
}
fn default_high_band() -> UnitBand {
    UnitBand::new(15, 34)
}
fn default_medium_band() -> UnitBand {
    UnitBand::new(8, 19)
}
fn default_low_band() -> UnitBand {
    UnitBand::new(2, 4)
}

impl Default for DemandSettings {
    fn default() -> Self {
        DemandSettings {
            high_volume_categories: default_high_categories(),
            low_volume_categories: default_low_categories(),
            high: default_high_band(),
            medium: default_medium_band(),
            low: default_low_band(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishmentSettings {
    #[serde(default = "default_initial_shelf_percent")]
    pub initial_shelf_percent: i64,

    #[serde(default = "default_one")]
    pub reorder_cover_days: i64,

    #[serde(default = "default_two")]
    pub order_cover_days: i64,

    #[serde(default = "default_restock_threshold_percent")]
    pub restock_threshold_percent: i64,

    /// A product reordered on day d is next eligible on d + cooldown.
    #[serde(default = "default_two")]
    pub reorder_cooldown_days: i64,
}

fn default_initial_shelf_percent() -> i64 {
    80
}
fn default_one() -> i64 {
    1
}
fn default_two() -> i64 {
    2
}
fn default_restock_threshold_percent() -> i64 {
    30
}

impl Default for ReplenishmentSettings {
    fn default() -> Self {
        ReplenishmentSettings {
            initial_shelf_percent: default_initial_shelf_percent(),
            reorder_cover_days: default_one(),
            order_cover_days: default_two(),
            restock_threshold_percent: default_restock_threshold_percent(),
            reorder_cooldown_days: default_two(),
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSettings {
    #[serde(default = "default_min_customers")]
    pub min_customers: u32,

    #[serde(default = "default_max_customers")]
    pub max_customers: u32,

    /// Chance that a sale belongs to a known member, in percent.
    #[serde(default = "default_member_percent")]
    pub member_percent: u32,

    #[serde(default = "default_max_line_items")]
    pub max_line_items: u32,

    #[serde(default = "default_max_units_per_line")]
    pub max_units_per_line: i64,

    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// One loyalty point per this many currency units.
    #[serde(default = "default_points_divisor")]
    pub points_divisor: i64,
}

fn default_min_customers() -> u32 {
    20
}
fn default_max_customers() -> u32 {
    50
}
fn default_member_percent() -> u32 {
    70
}
fn default_max_line_items() -> u32 {
    8
}
fn default_max_units_per_line() -> i64 {
    3
}
fn default_tax_rate_bps() -> u32 {
    shelfwise_core::DEFAULT_TAX_RATE.bps()
}
fn default_points_divisor() -> i64 {
    shelfwise_core::POINTS_DIVISOR
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            min_customers: default_min_customers(),
            max_customers: default_max_customers(),
            member_percent: default_member_percent(),
            max_line_items: default_max_line_items(),
            max_units_per_line: default_max_units_per_line(),
            tax_rate_bps: default_tax_rate_bps(),
            points_divisor: default_points_divisor(),
        }
    }
}

impl SalesSettings {
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Expiry / Discount / Scenarios
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirySettings {
    /// Days ahead counted as near-expiry in aggregates and the summary.
    #[serde(default = "default_near_expiry_window")]
    pub near_expiry_window_days: i64,

    #[serde(default = "default_shelf_life")]
    pub default_shelf_life_days: i64,

    /// Receipts this close to the end date may get a forced expiry.
    #[serde(default = "default_expiry_tail")]
    pub tail_days: i64,

    #[serde(default = "default_fifteen")]
    pub expired_percent: u32,

    #[serde(default = "default_fifteen")]
    pub near_expiry_percent: u32,
}

fn default_near_expiry_window() -> i64 {
    shelfwise_core::NEAR_EXPIRY_WINDOW_DAYS
}
fn default_shelf_life() -> i64 {
    90
}
fn default_expiry_tail() -> i64 {
    5
}
fn default_fifteen() -> u32 {
    15
}

impl Default for ExpirySettings {
    fn default() -> Self {
        ExpirySettings {
            near_expiry_window_days: default_near_expiry_window(),
            default_shelf_life_days: default_shelf_life(),
            tail_days: default_expiry_tail(),
            expired_percent: default_fifteen(),
            near_expiry_percent: default_fifteen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_discount_window")]
    pub window_days: i64,
}

fn default_true() -> bool {
    true
}
fn default_discount_window() -> i64 {
    shelfwise_core::DISCOUNT_WINDOW_DAYS
}

impl Default for DiscountSettings {
    fn default() -> Self {
        DiscountSettings {
            enabled: true,
            window_days: default_discount_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scenarios run on each of the final `tail_days` days.
    #[serde(default = "default_scenario_tail")]
    pub tail_days: i64,

    #[serde(default = "default_expired_products")]
    pub expired_products: usize,

    #[serde(default = "default_near_expiry_products")]
    pub near_expiry_products: usize,

    #[serde(default = "default_expired_products")]
    pub warehouse_zero_products: usize,
}

fn default_scenario_tail() -> i64 {
    3
}
fn default_expired_products() -> usize {
    2
}
fn default_near_expiry_products() -> usize {
    3
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        ScenarioSettings {
            enabled: true,
            tail_days: default_scenario_tail(),
            expired_products: default_expired_products(),
            near_expiry_products: default_near_expiry_products(),
            warehouse_zero_products: default_expired_products(),
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub demand: DemandSettings,

    #[serde(default)]
    pub replenishment: ReplenishmentSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub expiry: ExpirySettings,

    #[serde(default)]
    pub discount: DiscountSettings,

    #[serde(default)]
    pub scenarios: ScenarioSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    ///
    /// Command-line flags are layered on by the caller, which then calls
    /// [`EngineConfig::validate`] again.
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else if explicit {
                return Err(EngineError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `SHELFWISE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SHELFWISE_DB") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(start) = lookup("SHELFWISE_START") {
            self.simulation.start_date = Some(parse_date("SHELFWISE_START", &start)?);
        }

        if let Some(end) = lookup("SHELFWISE_END") {
            self.simulation.end_date = Some(parse_date("SHELFWISE_END", &end)?);
        }

        if let Some(seed) = lookup("SHELFWISE_RNG_SEED") {
            match seed.parse::<u64>() {
                Ok(s) => self.simulation.rng_seed = Some(s),
                Err(_) => warn!(value = %seed, "Ignoring non-numeric SHELFWISE_RNG_SEED"),
            }
        }

        if let Some(policy) = lookup("SHELFWISE_TRANSFER_POLICY") {
            self.simulation.transfer_policy = policy.parse()?;
        }

        if let Some(window) = lookup("SHELFWISE_DISCOUNT_WINDOW") {
            match window.parse::<i64>() {
                Ok(w) => self.discount.window_days = w,
                Err(_) => warn!(value = %window, "Ignoring non-numeric SHELFWISE_DISCOUNT_WINDOW"),
            }
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if let (Some(start), Some(end)) = (self.simulation.start_date, self.simulation.end_date) {
            validate_date_range(start, end)?;
        }

        for (name, band) in [
            ("demand.high", self.demand.high),
            ("demand.medium", self.demand.medium),
            ("demand.low", self.demand.low),
        ] {
            if band.min < 0 || band.max < band.min {
                return Err(EngineError::Config(format!(
                    "{name} must satisfy 0 <= min <= max, got {}..={}",
                    band.min, band.max
                )));
            }
        }

        let r = &self.replenishment;
        validate_percent("replenishment.initial_shelf_percent", r.initial_shelf_percent)?;
        validate_percent("replenishment.restock_threshold_percent", r.restock_threshold_percent)?;
        if r.reorder_cover_days < 0 || r.order_cover_days < 1 || r.reorder_cooldown_days < 0 {
            return Err(EngineError::Config(
                "replenishment day counts must be non-negative and order_cover_days at least 1"
                    .into(),
            ));
        }

        let s = &self.sales;
        if s.min_customers > s.max_customers {
            return Err(EngineError::Config(
                "sales.min_customers must not exceed sales.max_customers".into(),
            ));
        }
        if s.member_percent > 100 {
            return Err(EngineError::Config("sales.member_percent must be <= 100".into()));
        }
        if s.max_line_items == 0 || s.max_units_per_line < 1 {
            return Err(EngineError::Config(
                "sales.max_line_items and sales.max_units_per_line must be at least 1".into(),
            ));
        }
        validate_tax_rate_bps(s.tax_rate_bps)?;
        if s.points_divisor <= 0 {
            return Err(EngineError::Config("sales.points_divisor must be positive".into()));
        }

        let e = &self.expiry;
        if e.expired_percent + e.near_expiry_percent > 100 {
            return Err(EngineError::Config(
                "expiry.expired_percent + expiry.near_expiry_percent must be <= 100".into(),
            ));
        }
        if e.default_shelf_life_days <= 0 || e.near_expiry_window_days < 0 || e.tail_days < 0 {
            return Err(EngineError::Config(
                "expiry day counts must be non-negative and shelf life positive".into(),
            ));
        }

        if self.discount.window_days < 0 {
            return Err(EngineError::Config("discount.window_days must be >= 0".into()));
        }
        if self.scenarios.tail_days < 0 {
            return Err(EngineError::Config("scenarios.tail_days must be >= 0".into()));
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shelfwise", "shelfwise")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Domain Views
    // =========================================================================

    pub fn demand_profile(&self) -> DemandProfile {
        DemandProfile {
            high_volume_categories: self.demand.high_volume_categories.clone(),
            low_volume_categories: self.demand.low_volume_categories.clone(),
            high: self.demand.high,
            medium: self.demand.medium,
            low: self.demand.low,
        }
    }

    pub fn replenishment_policy(&self) -> ReplenishmentPolicy {
        ReplenishmentPolicy {
            initial_shelf_percent: self.replenishment.initial_shelf_percent,
            reorder_cover_days: self.replenishment.reorder_cover_days,
            order_cover_days: self.replenishment.order_cover_days,
            restock_threshold_percent: self.replenishment.restock_threshold_percent,
            reorder_cooldown_days: self.replenishment.reorder_cooldown_days,
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            default_shelf_life_days: self.expiry.default_shelf_life_days,
            tail_days: self.expiry.tail_days,
            expired_percent: self.expiry.expired_percent,
            near_expiry_percent: self.expiry.near_expiry_percent,
        }
    }

    /// The run's date range, or a configuration error if either end is unset.
    pub fn date_range(&self) -> EngineResult<(NaiveDate, NaiveDate)> {
        match (self.simulation.start_date, self.simulation.end_date) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(EngineError::Config(
                "start and end dates are required (--start/--end or [simulation])".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.replenishment_policy(), ReplenishmentPolicy::default());
        assert_eq!(config.demand_profile(), DemandProfile::default());
        assert_eq!(config.expiry_policy(), ExpiryPolicy::default());
        assert_eq!(config.sales.tax_rate().bps(), 1_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [simulation]
            start_date = "2025-09-01"
            end_date = "2025-09-30"
            transfer_policy = "span_batches"

            [sales]
            member_percent = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.simulation.transfer_policy, AllocationPolicy::SpanBatches);
        assert_eq!(config.sales.member_percent, 50);
        assert_eq!(config.sales.max_customers, 50);
        assert_eq!(config.discount.window_days, 30);
        let (start, end) = config.date_range().unwrap();
        assert_eq!((end - start).num_days(), 29);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SHELFWISE_DB", "/tmp/store.db"),
            ("SHELFWISE_START", "2025-10-01"),
            ("SHELFWISE_END", "2025-10-07"),
            ("SHELFWISE_TRANSFER_POLICY", "span"),
            ("SHELFWISE_RNG_SEED", "not-a-number"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/store.db"));
        assert_eq!(config.simulation.transfer_policy, AllocationPolicy::SpanBatches);
        assert_eq!(config.simulation.rng_seed, None);
        assert_eq!(
            config.simulation.end_date,
            NaiveDate::from_ymd_opt(2025, 10, 7)
        );
    }

    #[test]
    fn test_bad_env_date_is_an_error() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "SHELFWISE_START").then(|| "2025-13-45".to_string())
        });
        assert!(result.unwrap_err().is_config_error());
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let mut config = EngineConfig::default();
        config.simulation.start_date = NaiveDate::from_ymd_opt(2025, 9, 30);
        config.simulation.end_date = NaiveDate::from_ymd_opt(2025, 9, 1);
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_validation_rejects_bad_sales_mix() {
        let mut config = EngineConfig::default();
        config.sales.min_customers = 60;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.expiry.expired_percent = 80;
        config.expiry.near_expiry_percent = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_dates() {
        assert!(EngineConfig::default().date_range().is_err());
    }

    #[test]
    fn test_memory_path_uses_in_memory_store() {
        let mut config = EngineConfig::default();
        config.database.path = PathBuf::from(":memory:");
        assert!(config.database.db_config().is_in_memory());
    }
}

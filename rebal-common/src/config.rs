//! Configuration management for the rebalancing planner.
//!
//! The planner reads `config.json` and an optional `scenarios.json` from
//! `~/.rebal`, or from a file or directory named on the command line.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (REBAL_* prefix)
//! 3. Default values (the three-stage example problem)
//!
//! # Environment Variable Mapping
//!
//! - `REBAL_CONFIG_DIR` → directory holding `config.json` / `scenarios.json`
//! - `REBAL_LOG_LEVEL` → observability.log_level
//! - `REBAL_LOG_FORMAT` → observability.log_format

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "REBAL_CONFIG_DIR";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".rebal"),
        |dirs| dirs.home_dir().join(".rebal"),
    )
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// The reallocation problem: holdings, instruments, scenarios
    #[serde(default)]
    pub portfolio: PortfolioConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Portfolio Problem Configuration
// ============================================================================

/// Static input table for one planning run.
///
/// All monetary figures are decimal currency units; the planner converts them
/// to integer minor units once, at compile time of the problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Minor units per currency unit (100 for cents)
    #[serde(default = "default_minor_units")]
    pub minor_units_per_unit: i64,

    /// Holdings at the start of stage 1
    #[serde(default)]
    pub start: StartAmounts,

    /// Tradable instruments
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Scenario table, one entry per decision stage
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    /// State-space discretization
    #[serde(default)]
    pub quantization: QuantizationConfig,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            minor_units_per_unit: default_minor_units(),
            start: StartAmounts::default(),
            assets: AssetsConfig::default(),
            stages: default_stages(),
            quantization: QuantizationConfig::default(),
        }
    }
}

fn default_minor_units() -> i64 {
    100
}

/// Starting amounts of the four state components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StartAmounts {
    pub asset1: f64,
    pub asset2: f64,
    pub deposit: f64,
    pub free_cash: f64,
}

impl Default for StartAmounts {
    fn default() -> Self {
        Self {
            asset1: 100.0,
            asset2: 800.0,
            deposit: 400.0,
            free_cash: 600.0,
        }
    }
}

impl StartAmounts {
    /// Total starting capital.
    pub fn total(&self) -> f64 {
        self.asset1 + self.asset2 + self.deposit + self.free_cash
    }
}

/// Trading parameters of one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Display name
    pub name: String,
    /// Lot size: every trade is a multiple of this amount
    pub step: f64,
    /// Holding floor a sale may not cross
    pub minimum: f64,
    /// Commission as a fraction of traded notional
    pub commission: f64,
}

/// The three tradable instruments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub asset1: AssetConfig,
    pub asset2: AssetConfig,
    pub deposit: AssetConfig,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            asset1: AssetConfig {
                name: "Security 1".into(),
                step: 25.0,
                minimum: 30.0,
                commission: 0.04,
            },
            asset2: AssetConfig {
                name: "Security 2".into(),
                step: 200.0,
                minimum: 150.0,
                commission: 0.07,
            },
            deposit: AssetConfig {
                name: "Deposit".into(),
                step: 100.0,
                minimum: 100.0,
                commission: 0.05,
            },
        }
    }
}

impl AssetsConfig {
    /// Instruments in state order.
    pub fn as_array(&self) -> [&AssetConfig; 3] {
        [&self.asset1, &self.asset2, &self.deposit]
    }
}

/// Scenario outcomes of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub outcomes: Vec<OutcomeConfig>,
}

/// One stochastic realization within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeConfig {
    /// Free-form label ("up", "flat", "down", ...)
    #[serde(default)]
    pub label: String,
    pub probability: f64,
    pub returns: ReturnsConfig,
}

/// Multiplicative return factor per instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnsConfig {
    pub asset1: f64,
    pub asset2: f64,
    pub deposit: f64,
}

impl ReturnsConfig {
    /// Factors in state order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.asset1, self.asset2, self.deposit]
    }
}

fn outcome(label: &str, probability: f64, asset1: f64, asset2: f64, deposit: f64) -> OutcomeConfig {
    OutcomeConfig {
        label: label.into(),
        probability,
        returns: ReturnsConfig {
            asset1,
            asset2,
            deposit,
        },
    }
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            outcomes: vec![
                outcome("up", 0.6, 1.2, 1.1, 1.07),
                outcome("flat", 0.3, 1.05, 1.02, 1.03),
                outcome("down", 0.1, 0.8, 0.95, 1.0),
            ],
        },
        StageConfig {
            outcomes: vec![
                outcome("up", 0.3, 1.4, 1.15, 1.01),
                outcome("flat", 0.2, 1.05, 1.0, 1.0),
                outcome("down", 0.5, 0.6, 0.9, 1.0),
            ],
        },
        StageConfig {
            outcomes: vec![
                outcome("up", 0.4, 1.15, 1.12, 1.05),
                outcome("flat", 0.4, 1.05, 1.01, 1.01),
                outcome("down", 0.2, 0.7, 0.94, 1.0),
            ],
        },
    ]
}

/// Discretization of the state space.
///
/// An asset component is snapped to a grid of `max(floor, step / divisor)`;
/// free cash is snapped to a grid of `cash`. Larger divisors mean a finer
/// grid and a larger reachable set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    pub asset1_divisor: i64,
    pub asset2_divisor: i64,
    pub deposit_divisor: i64,
    /// Smallest grid size for any asset component (currency units)
    pub floor: f64,
    /// Grid size for free cash (currency units)
    pub cash: f64,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            asset1_divisor: 2,
            asset2_divisor: 4,
            deposit_divisor: 2,
            floor: 1.0,
            cash: 1.0,
        }
    }
}

impl QuantizationConfig {
    /// Divisors in state order.
    pub fn divisors(&self) -> [i64; 3] {
        [self.asset1_divisor, self.asset2_divisor, self.deposit_divisor]
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load `config.json` merged with `scenarios.json` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let value = crate::config_loader::load_modular_config(Some(dir.to_path_buf()))?;
        serde_json::from_value(value)
            .context(format!("Failed to parse config from {}", dir.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load_from_dir(&config_dir())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("REBAL_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("REBAL_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }
}

//! Rebal Common - Shared configuration, validation, errors and logging for the
//! rebalancing planner.
//!
//! This crate provides:
//! - Configuration types and loading (single file or modular directory)
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and run identifiers
//! - Minor-unit and fixed-point rate conversions

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    AssetConfig, AssetsConfig, Config, ObservabilityConfig, OutcomeConfig, PortfolioConfig,
    QuantizationConfig, ReturnsConfig, StageConfig, StartAmounts,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, PortfolioConfig};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::validation::{Validate, ValidationError};
}

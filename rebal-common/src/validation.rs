//! Configuration validation.
//!
//! The solver assumes a well-formed input table; everything it cannot
//! tolerate is rejected here, before any state is built.

use thiserror::Error;

use crate::config::{
    AssetConfig, Config, ObservabilityConfig, PortfolioConfig, QuantizationConfig, StageConfig,
};

/// Number of decision stages the planner solves.
pub const STAGE_COUNT: usize = 3;

/// Tolerance for per-stage probability sums.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Largest amount, step or minimum accepted, in currency units.
pub const MAX_AMOUNT: f64 = 1e9;

/// Largest accepted `minor_units_per_unit`.
pub const MAX_MINOR_UNITS_PER_UNIT: i64 = 10_000;

/// Largest accepted per-stage return multiplier.
///
/// With the amount and minor-unit caps this keeps every state component,
/// and every ppm product formed from it, inside `i64` over three stages.
pub const MAX_RETURN_FACTOR: f64 = 10.0;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field paths named by this error, flattened.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidValue { field, .. } => vec![field.as_str()],
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.fields()).collect(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Collapse collected errors into a single result.
fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

fn check_amount(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ValidationError::invalid(field, "must be a finite non-negative amount"));
    } else if value > MAX_AMOUNT {
        errors.push(ValidationError::invalid(
            field,
            format!("must not exceed {MAX_AMOUNT}"),
        ));
    }
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }
        if let Err(e) = self.portfolio.validate() {
            errors.push(e);
        }

        collect(errors)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

impl Validate for PortfolioConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if !(1..=MAX_MINOR_UNITS_PER_UNIT).contains(&self.minor_units_per_unit) {
            errors.push(ValidationError::invalid(
                "portfolio.minor_units_per_unit",
                format!("must be in [1, {MAX_MINOR_UNITS_PER_UNIT}]"),
            ));
        }

        check_amount(&mut errors, "portfolio.start.free_cash", self.start.free_cash);

        let holdings = [self.start.asset1, self.start.asset2, self.start.deposit];
        for ((key, asset), held) in ["asset1", "asset2", "deposit"]
            .iter()
            .zip(self.assets.as_array())
            .zip(holdings)
        {
            let field = format!("portfolio.start.{key}");
            let before = errors.len();
            check_amount(&mut errors, &field, held);
            // a start under the floor would be quantized away silently
            if errors.len() == before && asset.minimum.is_finite() && held < asset.minimum {
                errors.push(ValidationError::invalid(
                    field,
                    format!("{held} is below the instrument minimum {}", asset.minimum),
                ));
            }

            if let Err(e) = validate_asset(asset, &format!("portfolio.assets.{key}")) {
                errors.push(e);
            }
        }

        if self.stages.len() != STAGE_COUNT {
            errors.push(ValidationError::invalid(
                "portfolio.stages",
                format!("expected {STAGE_COUNT} stages, found {}", self.stages.len()),
            ));
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            if let Err(e) = validate_stage(stage, &format!("portfolio.stages[{idx}]")) {
                errors.push(e);
            }
        }

        if let Err(e) = self.quantization.validate() {
            errors.push(e);
        }

        collect(errors)
    }
}

fn validate_asset(asset: &AssetConfig, field: &str) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if asset.name.trim().is_empty() {
        errors.push(ValidationError::MissingField {
            field: format!("{field}.name"),
        });
    }
    if !asset.step.is_finite() || asset.step <= 0.0 || asset.step > MAX_AMOUNT {
        errors.push(ValidationError::invalid(
            format!("{field}.step"),
            format!("must be in (0, {MAX_AMOUNT}]"),
        ));
    }
    check_amount(&mut errors, &format!("{field}.minimum"), asset.minimum);
    if !(0.0..1.0).contains(&asset.commission) {
        errors.push(ValidationError::invalid(
            format!("{field}.commission"),
            "must be in [0, 1)",
        ));
    }

    collect(errors)
}

fn validate_stage(stage: &StageConfig, field: &str) -> ValidationResult<()> {
    if stage.outcomes.is_empty() {
        return Err(ValidationError::MissingField {
            field: format!("{field}.outcomes"),
        });
    }

    let mut errors = Vec::new();
    let mut total = 0.0;

    for (idx, outcome) in stage.outcomes.iter().enumerate() {
        let path = format!("{field}.outcomes[{idx}]");
        if !(0.0..=1.0).contains(&outcome.probability) {
            errors.push(ValidationError::invalid(
                format!("{path}.probability"),
                "must be in [0, 1]",
            ));
        }
        total += outcome.probability;

        for (key, factor) in ["asset1", "asset2", "deposit"]
            .iter()
            .zip(outcome.returns.as_array())
        {
            if !factor.is_finite() || factor <= 0.0 || factor > MAX_RETURN_FACTOR {
                errors.push(ValidationError::invalid(
                    format!("{path}.returns.{key}"),
                    format!("must be a positive multiplier no larger than {MAX_RETURN_FACTOR}"),
                ));
            }
        }
    }

    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        errors.push(ValidationError::invalid(
            format!("{field}.outcomes"),
            format!("probabilities sum to {total}, expected 1.0"),
        ));
    }

    collect(errors)
}

impl Validate for QuantizationConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        for (key, divisor) in ["asset1_divisor", "asset2_divisor", "deposit_divisor"]
            .iter()
            .zip(self.divisors())
        {
            if divisor < 1 {
                errors.push(ValidationError::invalid(
                    format!("portfolio.quantization.{key}"),
                    "must be at least 1",
                ));
            }
        }
        if !self.floor.is_finite() || self.floor <= 0.0 || self.floor > MAX_AMOUNT {
            errors.push(ValidationError::invalid(
                "portfolio.quantization.floor",
                format!("must be in (0, {MAX_AMOUNT}]"),
            ));
        }
        if !self.cash.is_finite() || self.cash <= 0.0 || self.cash > MAX_AMOUNT {
            errors.push(ValidationError::invalid(
                "portfolio.quantization.cash",
                format!("must be in (0, {MAX_AMOUNT}]"),
            ));
        }

        collect(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.observability.log_level = "loud".into();
        let result = config.validate();
        if let Err(ValidationError::InvalidValue { field, .. }) = result {
            assert_eq!(field, "observability.log_level");
        } else {
            panic!("expected InvalidValue, got {result:?}");
        }
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.stages[1].outcomes[0].probability = 0.31;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["portfolio.stages[1].outcomes"]);
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.assets.asset2.step = 0.0;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["portfolio.assets.asset2.step"]);
    }

    #[test]
    fn test_commission_must_be_below_one() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.assets.deposit.commission = 1.0;
        portfolio.assets.asset1.commission = -0.01;
        let err = portfolio.validate().unwrap_err();
        assert!(matches!(err, ValidationError::Multiple(_)));
        let fields = err.fields();
        assert!(fields.contains(&"portfolio.assets.asset1.commission"));
        assert!(fields.contains(&"portfolio.assets.deposit.commission"));
    }

    #[test]
    fn test_stage_count_enforced() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.stages.pop();
        let err = portfolio.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["portfolio.stages"]);
    }

    #[test]
    fn test_empty_stage_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.stages[2].outcomes.clear();
        let err = portfolio.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["portfolio.stages[2].outcomes"]);
    }

    #[test]
    fn test_zero_return_factor_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.stages[0].outcomes[2].returns.asset1 = 0.0;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["portfolio.stages[0].outcomes[2].returns.asset1"]
        );
    }

    #[test]
    fn test_quantization_bounds() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.quantization.asset2_divisor = 0;
        portfolio.quantization.cash = 0.0;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec![
                "portfolio.quantization.asset2_divisor",
                "portfolio.quantization.cash"
            ]
        );
    }

    #[test]
    fn test_negative_start_amount_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.start.free_cash = -1.0;
        assert!(portfolio.validate().is_err());
    }

    #[test]
    fn test_start_below_minimum_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.start.asset1 = 10.0;
        portfolio.start.deposit = 0.0;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["portfolio.start.asset1", "portfolio.start.deposit"]
        );
        assert!(err.to_string().contains("below the instrument minimum"));
    }

    #[test]
    fn test_start_at_minimum_accepted() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.start.asset1 = 30.0;
        portfolio.start.asset2 = 150.0;
        portfolio.start.deposit = 100.0;
        assert!(portfolio.validate().is_ok());
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.start.free_cash = 1e15;
        portfolio.assets.asset2.step = 1e12;
        portfolio.minor_units_per_unit = 1_000_000;
        let err = portfolio.validate().unwrap_err();
        let fields = err.fields();
        assert!(fields.contains(&"portfolio.start.free_cash"));
        assert!(fields.contains(&"portfolio.assets.asset2.step"));
        assert!(fields.contains(&"portfolio.minor_units_per_unit"));
    }

    #[test]
    fn test_return_factor_capped() {
        let mut portfolio = PortfolioConfig::default();
        portfolio.stages[1].outcomes[0].returns.deposit = MAX_RETURN_FACTOR;
        assert!(portfolio.validate().is_ok());
        portfolio.stages[1].outcomes[0].returns.deposit = 1e6;
        let err = portfolio.validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["portfolio.stages[1].outcomes[0].returns.deposit"]
        );
    }
}

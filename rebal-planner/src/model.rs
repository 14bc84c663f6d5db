//! Integer problem model.
//!
//! The configuration table arrives in decimal units; [`Problem::from_config`]
//! validates it and compiles it into minor-unit money and parts-per-million
//! rates, so the solver never multiplies floating-point money.

use serde::{Deserialize, Serialize};
use std::fmt;

use rebal_common::util::{from_minor_units, mul_ppm_round, to_minor_units, to_ppm, RATE_SCALE};
use rebal_common::validation::STAGE_COUNT;
use rebal_common::{PortfolioConfig, Validate};

use crate::dp::quantizer::Quantizer;
use crate::error::PlanError;

/// Number of tradable instruments (two securities and the deposit).
pub const ASSET_COUNT: usize = 3;

// ============================================================================
// State
// ============================================================================

/// Holdings-plus-cash vector at a stage boundary, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub asset1: i64,
    pub asset2: i64,
    pub deposit: i64,
    pub free_cash: i64,
}

impl State {
    pub const fn new(asset1: i64, asset2: i64, deposit: i64, free_cash: i64) -> Self {
        Self {
            asset1,
            asset2,
            deposit,
            free_cash,
        }
    }

    /// Build a state from tradable holdings and cash.
    pub const fn from_parts(holdings: [i64; ASSET_COUNT], free_cash: i64) -> Self {
        Self::new(holdings[0], holdings[1], holdings[2], free_cash)
    }

    /// Tradable holdings in instrument order.
    pub const fn holdings(&self) -> [i64; ASSET_COUNT] {
        [self.asset1, self.asset2, self.deposit]
    }

    /// Liquidation value: the sum of all four components.
    pub const fn total(&self) -> i64 {
        self.asset1 + self.asset2 + self.deposit + self.free_cash
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, cash {})",
            self.asset1, self.asset2, self.deposit, self.free_cash
        )
    }
}

// ============================================================================
// Control
// ============================================================================

/// Signed reallocation deltas for the three tradable instruments.
///
/// Positive is a buy, negative a sale. The free-cash delta is derived:
/// `-(sum of deltas) - commission`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Control {
    pub asset1: i64,
    pub asset2: i64,
    pub deposit: i64,
}

impl Control {
    /// The do-nothing control.
    pub const NOOP: Control = Control::new(0, 0, 0);

    pub const fn new(asset1: i64, asset2: i64, deposit: i64) -> Self {
        Self {
            asset1,
            asset2,
            deposit,
        }
    }

    pub const fn from_deltas(deltas: [i64; ASSET_COUNT]) -> Self {
        Self::new(deltas[0], deltas[1], deltas[2])
    }

    /// Deltas in instrument order.
    pub const fn deltas(&self) -> [i64; ASSET_COUNT] {
        [self.asset1, self.asset2, self.deposit]
    }

    pub const fn is_noop(&self) -> bool {
        self.asset1 == 0 && self.asset2 == 0 && self.deposit == 0
    }

    /// Net notional moved out of free cash, before commission.
    pub const fn net_notional(&self) -> i64 {
        self.asset1 + self.asset2 + self.deposit
    }

    /// Total commission: each leg rounded half up independently, then summed.
    pub fn commission(&self, assets: &[AssetParams; ASSET_COUNT]) -> i64 {
        assets
            .iter()
            .zip(self.deltas())
            .map(|(asset, delta)| asset.commission(delta))
            .sum()
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:+}, {:+}, {:+})", self.asset1, self.asset2, self.deposit)
    }
}

// ============================================================================
// Instruments and Scenarios
// ============================================================================

/// Trading parameters of one instrument, in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetParams {
    pub name: String,
    /// Lot size
    pub step: i64,
    /// Floor a sale may not cross
    pub minimum: i64,
    /// Commission rate, parts-per-million of traded notional
    pub commission_ppm: i64,
}

impl AssetParams {
    /// Commission charged on a trade of `delta`, rounded half up.
    pub fn commission(&self, delta: i64) -> i64 {
        mul_ppm_round(delta.abs(), self.commission_ppm)
    }

    /// Cash needed to buy `amount`: notional plus commission.
    pub fn buy_cost(&self, amount: i64) -> i64 {
        amount + self.commission(amount)
    }
}

/// One stochastic realization within a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub label: String,
    pub probability: f64,
    /// Return multiplier per instrument, parts-per-million
    pub factors_ppm: [i64; ASSET_COUNT],
}

/// A decision stage with its scenario outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// 1-based stage number
    pub number: usize,
    pub outcomes: Vec<Outcome>,
}

impl Stage {
    /// Probability-weighted multiplier per instrument, as a plain fraction.
    pub fn expected_factors(&self) -> [f64; ASSET_COUNT] {
        let mut expected = [0.0; ASSET_COUNT];
        for outcome in &self.outcomes {
            for (acc, factor) in expected.iter_mut().zip(outcome.factors_ppm) {
                *acc += outcome.probability * factor as f64 / RATE_SCALE as f64;
            }
        }
        expected
    }
}

// ============================================================================
// Problem
// ============================================================================

/// A compiled, validated planning problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub minor_per_unit: i64,
    pub start: State,
    pub assets: [AssetParams; ASSET_COUNT],
    pub stages: Vec<Stage>,
    pub quantizer: Quantizer,
}

impl Problem {
    /// Validate a configuration table and compile it to integer form.
    pub fn from_config(config: &PortfolioConfig) -> Result<Self, PlanError> {
        config.validate()?;

        let minor = config.minor_units_per_unit;
        let money = |amount: f64| to_minor_units(amount, minor);

        let start = State::new(
            money(config.start.asset1),
            money(config.start.asset2),
            money(config.start.deposit),
            money(config.start.free_cash),
        );

        let assets = config.assets.as_array().map(|asset| AssetParams {
            name: asset.name.clone(),
            step: money(asset.step),
            minimum: money(asset.minimum),
            commission_ppm: to_ppm(asset.commission),
        });

        for (asset, raw) in assets.iter().zip(config.assets.as_array()) {
            if asset.step <= 0 {
                return Err(PlanError::InvalidConfig(
                    rebal_common::ValidationError::InvalidValue {
                        field: format!("portfolio.assets.{}.step", asset.name),
                        reason: format!(
                            "step {} rounds to zero minor units at {minor} per unit",
                            raw.step
                        ),
                    },
                ));
            }
        }

        let stages: Vec<Stage> = config
            .stages
            .iter()
            .enumerate()
            .map(|(idx, stage)| Stage {
                number: idx + 1,
                outcomes: stage
                    .outcomes
                    .iter()
                    .map(|o| Outcome {
                        label: o.label.clone(),
                        probability: o.probability,
                        factors_ppm: o.returns.as_array().map(to_ppm),
                    })
                    .collect(),
            })
            .collect();
        debug_assert_eq!(stages.len(), STAGE_COUNT);

        let quantizer = Quantizer::new(&assets, &config.quantization, minor);

        Ok(Self {
            minor_per_unit: minor,
            start,
            assets,
            stages,
            quantizer,
        })
    }

    /// Stage by 1-based number.
    pub fn stage(&self, number: usize) -> &Stage {
        &self.stages[number - 1]
    }

    /// Number of decision stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Total commission of a control under this problem's instruments.
    pub fn commission(&self, control: &Control) -> i64 {
        control.commission(&self.assets)
    }

    /// Expected terminal value of holding `state` through every stage without
    /// trading and without quantization.
    ///
    /// Stage factors are independent, so each holding grows by the product of
    /// its per-stage expected multipliers. Cash earns nothing.
    pub fn hold_expected_value(&self, state: &State) -> f64 {
        let mut growth = [1.0; ASSET_COUNT];
        for stage in &self.stages {
            for (acc, factor) in growth.iter_mut().zip(stage.expected_factors()) {
                *acc *= factor;
            }
        }
        state
            .holdings()
            .iter()
            .zip(growth)
            .map(|(amount, g)| *amount as f64 * g)
            .sum::<f64>()
            + state.free_cash as f64
    }

    /// Convert minor units to decimal currency units.
    pub fn to_units(&self, minor: i64) -> f64 {
        from_minor_units(minor, self.minor_per_unit)
    }
}

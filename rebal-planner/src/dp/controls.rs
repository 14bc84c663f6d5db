//! Feasible-control enumeration.
//!
//! Controls come out in a fixed order that the solver's tie-break relies on:
//!
//! 1. the no-op
//! 2. corner sells, one instrument at a time (asset1, asset2, deposit)
//! 3. buy combinations, a lattice walk over package counts of asset1, then
//!    asset2, then deposit, cut off as soon as the running cost exceeds free
//!    cash

use crate::model::{AssetParams, Control, State, ASSET_COUNT};

/// Enumerates controls for a state.
#[derive(Debug, Clone, Copy)]
pub struct ControlGenerator<'a> {
    assets: &'a [AssetParams; ASSET_COUNT],
}

impl<'a> ControlGenerator<'a> {
    pub fn new(assets: &'a [AssetParams; ASSET_COUNT]) -> Self {
        Self { assets }
    }

    /// All feasible controls for `state`, no-op first.
    pub fn feasible_controls(&self, state: &State) -> Vec<Control> {
        let mut controls = vec![Control::NOOP];
        controls.extend(self.corner_sells(state));
        controls.extend(self.buy_controls(state.free_cash));
        controls
    }

    /// Sell one holding down toward its minimum in whole lots.
    ///
    /// The sale is the largest multiple of the step that keeps the holding at
    /// or above its minimum, so it lands exactly on the minimum whenever the
    /// excess is step-aligned. Holdings with less than one lot of excess
    /// produce no control.
    pub fn corner_sells(&self, state: &State) -> Vec<Control> {
        let holdings = state.holdings();
        let mut controls = Vec::with_capacity(ASSET_COUNT);

        for (i, asset) in self.assets.iter().enumerate() {
            let excess = holdings[i] - asset.minimum;
            let lots = excess.max(0) / asset.step;
            if lots > 0 {
                let mut deltas = [0; ASSET_COUNT];
                deltas[i] = -lots * asset.step;
                controls.push(Control::from_deltas(deltas));
            }
        }

        controls
    }

    /// Every affordable buy combination except the all-zero one.
    ///
    /// Each leg pays its own rounded commission, matching
    /// [`crate::model::Problem::commission`].
    pub fn buy_controls(&self, free_cash: i64) -> Vec<Control> {
        let [a1, a2, dep] = self.assets;
        let mut controls = Vec::new();

        for k1 in 0.. {
            let d1 = k1 * a1.step;
            let cost1 = a1.buy_cost(d1);
            if cost1 > free_cash {
                break;
            }

            for k2 in 0.. {
                let d2 = k2 * a2.step;
                let cost2 = cost1 + a2.buy_cost(d2);
                if cost2 > free_cash {
                    break;
                }

                for kd in 0.. {
                    let dd = kd * dep.step;
                    let cost = cost2 + dep.buy_cost(dd);
                    if cost > free_cash {
                        break;
                    }
                    if k1 + k2 + kd > 0 {
                        controls.push(Control::new(d1, d2, dd));
                    }
                }
            }
        }

        controls
    }
}

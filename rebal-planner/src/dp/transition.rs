//! State transitions: trading (control) and market moves (scenario).

use rebal_common::util::mul_ppm_floor;

use crate::dp::quantizer::Quantizer;
use crate::model::{AssetParams, Control, Outcome, State, ASSET_COUNT};

/// Applies controls and scenario outcomes to states.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    assets: &'a [AssetParams; ASSET_COUNT],
    quantizer: &'a Quantizer,
}

impl<'a> Transition<'a> {
    pub fn new(assets: &'a [AssetParams; ASSET_COUNT], quantizer: &'a Quantizer) -> Self {
        Self { assets, quantizer }
    }

    /// Trade from `state`, paying deltas and commission out of free cash.
    ///
    /// Returns `None` when a delta is not a whole number of lots, when a sale
    /// would leave a holding below its minimum, or when free cash would go
    /// negative. The no-op is always accepted.
    pub fn apply_control(&self, state: &State, control: &Control) -> Option<State> {
        let holdings = state.holdings();
        let deltas = control.deltas();
        let mut next = [0; ASSET_COUNT];

        for i in 0..ASSET_COUNT {
            let asset = &self.assets[i];
            if deltas[i] % asset.step != 0 {
                return None;
            }
            next[i] = holdings[i] + deltas[i];
            if deltas[i] < 0 && next[i] < asset.minimum {
                return None;
            }
        }

        let free_cash = state.free_cash - control.net_notional() - control.commission(self.assets);
        if free_cash < 0 {
            return None;
        }

        Some(self.quantizer.quantize(&State::from_parts(next, free_cash)))
    }

    /// Whether `control` can be applied to `state`.
    pub fn is_feasible(&self, state: &State, control: &Control) -> bool {
        self.apply_control(state, control).is_some()
    }

    /// Grow holdings by one outcome's multipliers, truncating; cash is idle.
    pub fn apply_scenario(&self, state: &State, outcome: &Outcome) -> State {
        let mut next = state.holdings();
        for (amount, factor) in next.iter_mut().zip(outcome.factors_ppm) {
            *amount = mul_ppm_floor(*amount, factor);
        }
        self.quantizer
            .quantize(&State::from_parts(next, state.free_cash))
    }

    /// Grow holdings by fractional (expected) multipliers, flooring.
    pub fn apply_expected(&self, state: &State, factors: [f64; ASSET_COUNT]) -> State {
        let mut next = state.holdings();
        for (amount, factor) in next.iter_mut().zip(factors) {
            *amount = (*amount as f64 * factor).floor() as i64;
        }
        self.quantizer
            .quantize(&State::from_parts(next, state.free_cash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Problem;
    use rebal_common::PortfolioConfig;
    use test_case::test_case;

    fn example() -> Problem {
        Problem::from_config(&PortfolioConfig::default()).unwrap()
    }

    #[test]
    fn test_noop_keeps_state() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        assert_eq!(t.apply_control(&problem.start, &Control::NOOP), Some(problem.start));
        // a holding pushed below its floor by the market still accepts the no-op
        let hurt = State::new(1250, 15_000, 10_000, 0);
        assert_eq!(t.apply_control(&hurt, &Control::NOOP), Some(hurt));
    }

    #[test]
    fn test_buy_pays_notional_and_commission() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        let next = t
            .apply_control(&problem.start, &Control::new(2500, 20_000, 0))
            .unwrap();
        // 600.00 - 25.00 - 1.00 - 200.00 - 14.00
        assert_eq!(next, State::new(12_500, 100_000, 40_000, 36_000));
    }

    #[test]
    fn test_sell_credits_proceeds_less_commission() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        let next = t
            .apply_control(&problem.start, &Control::new(0, 0, -30_000))
            .unwrap();
        // 600.00 + 300.00 - 15.00
        assert_eq!(next, State::new(10_000, 80_000, 10_000, 88_500));
    }

    #[test_case(Control::new(1000, 0, 0) ; "off-step buy")]
    #[test_case(Control::new(0, -80_000, 0) ; "sale through minimum")]
    #[test_case(Control::new(0, 0, 60_000) ; "unaffordable buy")]
    #[test_case(Control::new(-7500, 0, 0) ; "sale below minimum by one lot")]
    fn test_infeasible_controls(control: Control) {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        assert_eq!(t.apply_control(&problem.start, &control), None);
        assert!(!t.is_feasible(&problem.start, &control));
    }

    #[test]
    fn test_cash_debited_by_problem_commission() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        let control = Control::new(-5000, 40_000, 10_000);
        assert_eq!(problem.commission(&control), 200 + 2800 + 500);

        // 600.00 + 50.00 - 400.00 - 100.00 - 35.00 leaves 115.00, already on the 1.00 grid
        let next = t.apply_control(&problem.start, &control).unwrap();
        assert_eq!(
            next.free_cash,
            problem.start.free_cash - control.net_notional() - problem.commission(&control)
        );
        assert_eq!(next.free_cash, 11_500);
    }

    #[test]
    fn test_scenario_truncates_and_leaves_cash() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        let up = &problem.stage(1).outcomes[0];
        let next = t.apply_scenario(&problem.start, up);
        // 120.00 -> 112.50 on a 12.50 grid; 880.00 -> 850.00; 428.00 -> 400.00
        assert_eq!(next, State::new(11_250, 85_000, 40_000, 60_000));
    }

    #[test]
    fn test_expected_growth_path() {
        let problem = example();
        let t = Transition::new(&problem.assets, &problem.quantizer);
        let next = t.apply_expected(&problem.start, [1.5, 1.0, 1.0]);
        assert_eq!(next, State::new(15_000, 80_000, 40_000, 60_000));
    }
}

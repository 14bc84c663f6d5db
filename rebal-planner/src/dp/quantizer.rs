//! State quantization.
//!
//! Maps any state to a canonical grid representative so that reachable sets
//! stay finite and table lookups are exact.

use rebal_common::util::to_minor_units;
use rebal_common::QuantizationConfig;

use crate::model::{AssetParams, State, ASSET_COUNT};

/// Per-dimension grid with holding floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    /// Grid size for asset1, asset2, deposit, free cash
    grid: [i64; ASSET_COUNT + 1],
    /// Holding minimums of the tradable instruments
    minimums: [i64; ASSET_COUNT],
}

impl Quantizer {
    /// Derive the grid from instrument steps.
    ///
    /// Asset grids are `max(floor, step / divisor)`; the cash grid is taken
    /// as configured. Every grid is at least one minor unit.
    pub fn new(assets: &[AssetParams; ASSET_COUNT], config: &QuantizationConfig, minor: i64) -> Self {
        let floor = to_minor_units(config.floor, minor).max(1);
        let mut grid = [1; ASSET_COUNT + 1];
        for ((cell, asset), divisor) in grid.iter_mut().zip(assets).zip(config.divisors()) {
            *cell = (asset.step / divisor.max(1)).max(floor);
        }
        grid[ASSET_COUNT] = to_minor_units(config.cash, minor).max(1);

        Self {
            grid,
            minimums: [assets[0].minimum, assets[1].minimum, assets[2].minimum],
        }
    }

    /// Grid sizes for asset1, asset2, deposit and free cash.
    pub fn grid(&self) -> [i64; ASSET_COUNT + 1] {
        self.grid
    }

    /// Snap a state onto the grid.
    ///
    /// Each component is rounded down to a multiple of its grid size. A holding
    /// at or above its minimum is never rounded below that minimum, so a sale
    /// that stops exactly at the floor stays legal after snapping.
    pub fn quantize(&self, state: &State) -> State {
        let holdings = state.holdings();
        let mut snapped = [0; ASSET_COUNT];
        for i in 0..ASSET_COUNT {
            snapped[i] = snap_with_floor(holdings[i], self.grid[i], self.minimums[i]);
        }
        State::from_parts(snapped, snap(state.free_cash, self.grid[ASSET_COUNT]))
    }

    /// True when `state` is already a grid representative.
    pub fn is_canonical(&self, state: &State) -> bool {
        self.quantize(state) == *state
    }
}

fn snap(value: i64, grid: i64) -> i64 {
    value.div_euclid(grid) * grid
}

fn snap_with_floor(value: i64, grid: i64, minimum: i64) -> i64 {
    let snapped = snap(value, grid);
    if value >= minimum {
        snapped.max(minimum)
    } else {
        snapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Problem;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rebal_common::PortfolioConfig;

    fn example_quantizer() -> Quantizer {
        Problem::from_config(&PortfolioConfig::default())
            .unwrap()
            .quantizer
    }

    #[test]
    fn test_example_grid() {
        // steps 25/200/100 with divisors 2/4/2 and a 1.00 floor; cash at 1.00
        assert_eq!(example_quantizer().grid(), [1250, 5000, 5000, 100]);
    }

    #[test]
    fn test_floor_bounds_fine_grids() {
        let mut config = PortfolioConfig::default();
        config.quantization.asset1_divisor = 1000;
        let quantizer = Problem::from_config(&config).unwrap().quantizer;
        assert_eq!(quantizer.grid()[0], 100);
    }

    #[test]
    fn test_rounds_down_to_grid() {
        let q = example_quantizer();
        let state = State::new(12_000, 87_654, 41_999, 60_099);
        assert_eq!(q.quantize(&state), State::new(11_250, 85_000, 40_000, 60_000));
    }

    #[test]
    fn test_minimum_is_preserved() {
        let q = example_quantizer();
        // 30.00 minimum sits between grid points 25.00 and 37.50
        assert_eq!(q.quantize(&State::new(3000, 15_000, 10_000, 0)).asset1, 3000);
        assert_eq!(q.quantize(&State::new(3600, 15_000, 10_000, 0)).asset1, 3000);
        // below the minimum (after a loss) plain flooring applies
        assert_eq!(q.quantize(&State::new(2400, 15_000, 10_000, 0)).asset1, 1250);
    }

    #[test]
    fn test_is_canonical() {
        let q = example_quantizer();
        assert!(q.is_canonical(&State::new(10_000, 80_000, 40_000, 60_000)));
        assert!(!q.is_canonical(&State::new(10_001, 80_000, 40_000, 60_000)));
    }

    proptest! {
        #[test]
        fn prop_quantize_is_idempotent(
            a1 in 0i64..1_000_000,
            a2 in 0i64..1_000_000,
            dep in 0i64..1_000_000,
            cash in 0i64..1_000_000,
        ) {
            let q = example_quantizer();
            let once = q.quantize(&State::new(a1, a2, dep, cash));
            prop_assert_eq!(q.quantize(&once), once);
        }

        #[test]
        fn prop_quantize_never_increases_components(
            a1 in 0i64..1_000_000,
            a2 in 0i64..1_000_000,
            dep in 0i64..1_000_000,
            cash in 0i64..1_000_000,
        ) {
            let q = example_quantizer();
            let state = State::new(a1, a2, dep, cash);
            let snapped = q.quantize(&state);
            prop_assert!(snapped.asset1 <= a1 && snapped.asset2 <= a2);
            prop_assert!(snapped.deposit <= dep && snapped.free_cash <= cash);
            prop_assert!(state.free_cash - snapped.free_cash < q.grid()[3]);
        }
    }
}

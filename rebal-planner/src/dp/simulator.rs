//! Expected-path replay of the optimal policy.
//!
//! The replay advances by probability-weighted multipliers instead of any one
//! scenario, so the states it visits are generally not in the reachable sets.
//! Each one is snapped to the nearest reachable state of its stage to find a
//! policy entry.

use serde::Serialize;
use tracing::{debug, trace};

use crate::dp::solver::Planner;
use crate::dp::transition::Transition;
use crate::error::PlanError;
use crate::model::{Control, State, ASSET_COUNT};

/// One decision stage of a replayed trajectory. Amounts are minor units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStep {
    pub stage: usize,
    pub state_before: State,
    /// Reachable state whose policy entry was used
    pub policy_state: State,
    pub control: Control,
    pub commission: i64,
    /// True when the control was infeasible at `state_before` and was
    /// applied to `policy_state` instead
    pub applied_to_policy_state: bool,
    pub after_control: State,
    /// State after the expected market move
    pub state_after: State,
}

/// Illustrative trajectory along expected returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub start: State,
    pub steps: Vec<StageStep>,
    pub final_state: State,
    /// Liquidation value of the final state
    pub final_value: i64,
    pub total_commission: i64,
}

impl Trajectory {
    /// Stage-boundary states, start first.
    pub fn states(&self) -> Vec<State> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|s| s.state_after))
            .collect()
    }

    pub fn controls(&self) -> Vec<Control> {
        self.steps.iter().map(|s| s.control).collect()
    }
}

impl Planner {
    /// Solve, then replay the optimal policy along expected returns.
    pub fn simulate_expected_path(&mut self) -> Result<Trajectory, PlanError> {
        self.solve()?;
        self.replay_expected_path()
    }

    /// Replay the policy of the current solve without re-solving.
    pub fn replay_expected_path(&mut self) -> Result<Trajectory, PlanError> {
        if !self.is_solved() {
            return Err(PlanError::NotSolved);
        }

        let start = self.problem.quantizer.quantize(&self.problem.start);
        let mut current = start;
        let mut steps = Vec::with_capacity(self.problem.stage_count());

        for number in 1..=self.problem.stage_count() {
            let policy_state = self.snap(number, &current)?;
            let control = self
                .policy(number, &policy_state)
                .ok_or(PlanError::MissingPolicy {
                    stage: number,
                    state: policy_state,
                })?;

            let problem = &self.problem;
            let transition = Transition::new(&problem.assets, &problem.quantizer);

            let (after_control, applied_to_policy_state) =
                match transition.apply_control(&current, &control) {
                    Some(after) => (after, false),
                    None => {
                        let after = transition
                            .apply_control(&policy_state, &control)
                            .ok_or(PlanError::InfeasiblePolicy {
                                stage: number,
                                state: policy_state,
                                control,
                            })?;
                        (after, true)
                    }
                };

            let state_after =
                transition.apply_expected(&after_control, problem.stage(number).expected_factors());
            let commission = problem.commission(&control);

            debug!(
                stage = number,
                state = %current,
                policy_state = %policy_state,
                control = %control,
                commission,
                applied_to_policy_state,
                "Replayed stage"
            );

            steps.push(StageStep {
                stage: number,
                state_before: current,
                policy_state,
                control,
                commission,
                applied_to_policy_state,
                after_control,
                state_after,
            });
            current = state_after;
        }

        Ok(Trajectory {
            start,
            total_commission: steps.iter().map(|s| s.commission).sum(),
            final_value: current.total(),
            final_state: current,
            steps,
        })
    }

    /// Nearest reachable state of `stage`, cached per solve.
    ///
    /// The input is quantized first. A reachable input maps to itself;
    /// otherwise the candidate with the smallest [`Planner::snap_distance`]
    /// wins, the first in sorted order on ties.
    pub fn snap(&mut self, stage: usize, state: &State) -> Result<State, PlanError> {
        if !self.is_solved() {
            return Err(PlanError::NotSolved);
        }

        let state = self.problem.quantizer.quantize(state);
        let key = (stage, state);
        if let Some(hit) = self.snap_cache.get(&key) {
            return Ok(*hit);
        }

        let candidates = self.reachable(stage);
        let snapped = if candidates.binary_search(&state).is_ok() {
            state
        } else {
            let mut best: Option<(f64, State)> = None;
            for candidate in candidates {
                let distance = self.snap_distance(&state, candidate);
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, *candidate));
                }
            }
            let (distance, nearest) = best.ok_or(PlanError::EmptyReachableSet { stage })?;
            trace!(
                stage,
                state = %state,
                snapped = %nearest,
                distance,
                "Snapped off-table state"
            );
            nearest
        };

        self.snap_cache.insert(key, snapped);
        Ok(snapped)
    }

    /// Step-normalized L1 distance: instrument differences in lots, cash in
    /// currency units.
    pub fn snap_distance(&self, a: &State, b: &State) -> f64 {
        let problem = &self.problem;
        let lots: f64 = (0..ASSET_COUNT)
            .map(|i| {
                (a.holdings()[i] - b.holdings()[i]).abs() as f64 / problem.assets[i].step as f64
            })
            .sum();
        lots + (a.free_cash - b.free_cash).abs() as f64 / problem.minor_per_unit as f64
    }
}

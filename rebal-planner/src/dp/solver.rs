//! Backward Bellman pass.
//!
//! [`Planner`] owns every table of one planning run: reachable sets, value and
//! policy tables, and the snap cache used by the simulator. `solve` clears all
//! of them before rebuilding, so a planner can be solved repeatedly.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use rebal_common::logging::{generate_run_id, short_id};
use rebal_common::solve_span;

use crate::dp::controls::ControlGenerator;
use crate::dp::reachability::ReachabilityBuilder;
use crate::dp::transition::Transition;
use crate::error::PlanError;
use crate::model::{Control, Problem, State};

/// Summary of one solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveStats {
    pub run_id: String,
    /// Reachable-set size per stage, terminal stage last
    pub reachable_sizes: Vec<usize>,
    /// Bellman value of the quantized start state, minor units
    pub root_value: f64,
    pub elapsed_ms: u64,
}

/// Stochastic DP planner over a compiled [`Problem`].
#[derive(Debug)]
pub struct Planner {
    pub(crate) problem: Problem,
    /// Stage `k` at index `k - 1`; the terminal stage is last
    pub(crate) reachable: Vec<Vec<State>>,
    pub(crate) values: Vec<HashMap<State, f64>>,
    /// Decision stages only
    pub(crate) policies: Vec<HashMap<State, Control>>,
    pub(crate) snap_cache: HashMap<(usize, State), State>,
    pub(crate) stats: Option<SolveStats>,
}

impl Planner {
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            reachable: Vec::new(),
            values: Vec::new(),
            policies: Vec::new(),
            snap_cache: HashMap::new(),
            stats: None,
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Stats of the last successful solve.
    pub fn stats(&self) -> Option<&SolveStats> {
        self.stats.as_ref()
    }

    pub fn is_solved(&self) -> bool {
        self.stats.is_some()
    }

    /// Rebuild reachable sets and run the backward pass.
    pub fn solve(&mut self) -> Result<&SolveStats, PlanError> {
        self.reset();

        let run_id = generate_run_id();
        let span = solve_span!(short_id(&run_id), stages = self.problem.stage_count());
        let _enter = span.enter();
        let started = Instant::now();

        info!(
            start = %self.problem.start,
            grid = ?self.problem.quantizer.grid(),
            "Solve started"
        );

        let reachable = ReachabilityBuilder::new(&self.problem).build()?;
        let (values, policies) = self.backward(&reachable)?;

        let root = reachable[0][0];
        let root_value = values[0]
            .get(&root)
            .copied()
            .ok_or(PlanError::MissingValue {
                stage: 1,
                state: root,
            })?;

        let stats = SolveStats {
            run_id,
            reachable_sizes: reachable.iter().map(Vec::len).collect(),
            root_value,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            reachable = ?stats.reachable_sizes,
            root_value = self.problem.to_units(root_value.round() as i64),
            elapsed_ms = stats.elapsed_ms,
            "Solve finished"
        );

        self.reachable = reachable;
        self.values = values;
        self.policies = policies;
        Ok(self.stats.insert(stats))
    }

    fn reset(&mut self) {
        self.reachable.clear();
        self.values.clear();
        self.policies.clear();
        self.snap_cache.clear();
        self.stats = None;
    }

    #[allow(clippy::type_complexity)]
    fn backward(
        &self,
        reachable: &[Vec<State>],
    ) -> Result<(Vec<HashMap<State, f64>>, Vec<HashMap<State, Control>>), PlanError> {
        let problem = &self.problem;
        let stage_count = problem.stage_count();
        let generator = ControlGenerator::new(&problem.assets);
        let transition = Transition::new(&problem.assets, &problem.quantizer);

        let mut values: Vec<HashMap<State, f64>> = vec![HashMap::new(); stage_count + 1];
        let mut policies: Vec<HashMap<State, Control>> = vec![HashMap::new(); stage_count];

        let terminal = &reachable[stage_count];
        if terminal.is_empty() {
            return Err(PlanError::EmptyReachableSet {
                stage: stage_count + 1,
            });
        }
        values[stage_count] = terminal.iter().map(|s| (*s, s.total() as f64)).collect();

        for number in (1..=stage_count).rev() {
            let stage = problem.stage(number);
            let states = &reachable[number - 1];
            if states.is_empty() {
                return Err(PlanError::EmptyReachableSet { stage: number });
            }

            let next_values = &values[number];
            let mut stage_values = HashMap::with_capacity(states.len());
            let mut stage_policy = HashMap::with_capacity(states.len());
            let mut holds = 0usize;

            for state in states {
                let mut best: Option<(f64, Control)> = None;

                for control in generator.feasible_controls(state) {
                    let Some(after) = transition.apply_control(state, &control) else {
                        continue;
                    };

                    let mut expected = 0.0;
                    for outcome in &stage.outcomes {
                        let next = transition.apply_scenario(&after, outcome);
                        let value = next_values.get(&next).ok_or(PlanError::MissingValue {
                            stage: number + 1,
                            state: next,
                        })?;
                        expected += outcome.probability * value;
                    }

                    // strict comparison keeps the first maximizer
                    if best.map_or(true, |(value, _)| expected > value) {
                        best = Some((expected, control));
                    }
                }

                let (value, control) = best.ok_or(PlanError::MissingPolicy {
                    stage: number,
                    state: *state,
                })?;
                if control.is_noop() {
                    holds += 1;
                }
                stage_values.insert(*state, value);
                stage_policy.insert(*state, control);
            }

            debug!(
                stage = number,
                states = states.len(),
                holds,
                "Stage solved"
            );

            values[number - 1] = stage_values;
            policies[number - 1] = stage_policy;
        }

        Ok((values, policies))
    }

    /// Bellman value of a reachable state, minor units.
    ///
    /// Stages run `1..=stage_count + 1`; the last is terminal.
    pub fn value(&self, stage: usize, state: &State) -> Option<f64> {
        self.values
            .get(stage.checked_sub(1)?)
            .and_then(|table| table.get(state))
            .copied()
    }

    /// Optimal control of a reachable state at a decision stage.
    pub fn policy(&self, stage: usize, state: &State) -> Option<Control> {
        self.policies
            .get(stage.checked_sub(1)?)
            .and_then(|table| table.get(state))
            .copied()
    }

    /// Sorted reachable states of a stage; empty before a solve.
    pub fn reachable(&self, stage: usize) -> &[State] {
        stage
            .checked_sub(1)
            .and_then(|idx| self.reachable.get(idx))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

//! Forward reachability.
//!
//! Expands the quantized start state through every feasible control and every
//! scenario outcome, stage by stage. The result is the exact set of states the
//! backward pass has to cover.

use std::collections::HashSet;
use tracing::debug;

use crate::dp::controls::ControlGenerator;
use crate::dp::transition::Transition;
use crate::error::PlanError;
use crate::model::{Problem, State};

/// Builds reachable sets for stages `1..=stage_count + 1`.
pub struct ReachabilityBuilder<'a> {
    problem: &'a Problem,
}

impl<'a> ReachabilityBuilder<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Self { problem }
    }

    /// Reachable states per stage, each set sorted.
    ///
    /// Index 0 holds stage 1 (the quantized start state alone); the last
    /// entry is the terminal stage.
    pub fn build(&self) -> Result<Vec<Vec<State>>, PlanError> {
        let problem = self.problem;
        let generator = ControlGenerator::new(&problem.assets);
        let transition = Transition::new(&problem.assets, &problem.quantizer);

        let start = problem.quantizer.quantize(&problem.start);
        let mut sets = Vec::with_capacity(problem.stage_count() + 1);
        sets.push(vec![start]);

        for stage in &problem.stages {
            let current = &sets[stage.number - 1];
            let mut next: HashSet<State> = HashSet::new();
            let mut transitions = 0usize;

            for state in current {
                for control in generator.feasible_controls(state) {
                    let Some(after) = transition.apply_control(state, &control) else {
                        continue;
                    };
                    for outcome in &stage.outcomes {
                        next.insert(transition.apply_scenario(&after, outcome));
                        transitions += 1;
                    }
                }
            }

            if next.is_empty() {
                return Err(PlanError::EmptyReachableSet {
                    stage: stage.number + 1,
                });
            }

            let mut next: Vec<State> = next.into_iter().collect();
            next.sort_unstable();

            debug!(
                stage = stage.number + 1,
                states = next.len(),
                transitions,
                "Reachable set built"
            );
            sets.push(next);
        }

        Ok(sets)
    }
}

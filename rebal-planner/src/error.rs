//! Error types for the planner.

use rebal_common::ValidationError;

use crate::model::{Control, State};

/// Planner errors.
///
/// Infeasible controls are not errors; they are filtered out where they are
/// produced. Everything here except `InvalidConfig` and `NotSolved` means the
/// tables are internally inconsistent and the solve must stop.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Reachable set for stage {stage} is empty")]
    EmptyReachableSet { stage: usize },

    #[error("No value for stage {stage} state {state}")]
    MissingValue { stage: usize, state: State },

    #[error("No policy for stage {stage} state {state}")]
    MissingPolicy { stage: usize, state: State },

    #[error("Policy control {control} is infeasible at stage {stage} state {state}")]
    InfeasiblePolicy {
        stage: usize,
        state: State,
        control: Control,
    },

    #[error("Planner has not been solved")]
    NotSolved,
}

impl PlanError {
    /// Stable short code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::InvalidConfig(_) => "INVALID_CONFIG",
            PlanError::EmptyReachableSet { .. } => "EMPTY_REACHABLE_SET",
            PlanError::MissingValue { .. } => "MISSING_VALUE",
            PlanError::MissingPolicy { .. } => "MISSING_POLICY",
            PlanError::InfeasiblePolicy { .. } => "INFEASIBLE_POLICY",
            PlanError::NotSolved => "NOT_SOLVED",
        }
    }

    /// True for errors caused by caller input rather than a broken invariant.
    pub fn is_config(&self) -> bool {
        matches!(self, PlanError::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanError::MissingPolicy {
            stage: 2,
            state: State::new(1, 2, 3, 4),
        };
        assert_eq!(err.to_string(), "No policy for stage 2 state (1, 2, 3, cash 4)");
        assert_eq!(err.code(), "MISSING_POLICY");
        assert!(!err.is_config());
    }

    #[test]
    fn test_validation_error_converts() {
        let err: PlanError = ValidationError::MissingField {
            field: "portfolio.stages".into(),
        }
        .into();
        assert!(err.is_config());
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}

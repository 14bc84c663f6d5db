//! Plan report generation.
//!
//! Converts a minor-unit [`Trajectory`] into decimal currency units for
//! printing or JSON output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dp::simulator::Trajectory;
use crate::dp::solver::SolveStats;
use crate::model::{Control, Problem, State};

/// Plan report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    /// Report title
    pub title: String,
    /// Solve that produced the policy
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Quantized starting holdings
    pub start: Holdings,
    /// One entry per decision stage
    pub stages: Vec<StageReport>,
    /// Instruments at the end of the path, with their minimums
    pub final_holdings: Vec<FinalHolding>,
    pub final_cash: f64,
    /// Liquidation value of the final state
    pub final_value: f64,
    pub total_commission: f64,
    /// Bellman value of the start state
    pub root_value: f64,
    /// Reachable-set size per stage, terminal stage last
    pub reachable_sizes: Vec<usize>,
}

/// Holdings-plus-cash in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub asset1: f64,
    pub asset2: f64,
    pub deposit: f64,
    pub free_cash: f64,
}

/// Trade deltas in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deltas {
    pub asset1: f64,
    pub asset2: f64,
    pub deposit: f64,
}

/// Report section for one decision stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: usize,
    pub before: Holdings,
    pub policy_state: Holdings,
    pub control: Deltas,
    pub commission: f64,
    pub applied_to_policy_state: bool,
    pub after_control: Holdings,
    pub after: Holdings,
}

/// Final amount of one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalHolding {
    pub name: String,
    pub amount: f64,
    pub minimum: f64,
}

impl PlanReport {
    /// Generate a report from a solved plan and its replayed trajectory
    pub fn generate(problem: &Problem, stats: &SolveStats, trajectory: &Trajectory) -> Self {
        let holdings = |state: &State| Holdings {
            asset1: problem.to_units(state.asset1),
            asset2: problem.to_units(state.asset2),
            deposit: problem.to_units(state.deposit),
            free_cash: problem.to_units(state.free_cash),
        };
        let deltas = |control: &Control| Deltas {
            asset1: problem.to_units(control.asset1),
            asset2: problem.to_units(control.asset2),
            deposit: problem.to_units(control.deposit),
        };

        let stages = trajectory
            .steps
            .iter()
            .map(|step| StageReport {
                stage: step.stage,
                before: holdings(&step.state_before),
                policy_state: holdings(&step.policy_state),
                control: deltas(&step.control),
                commission: problem.to_units(step.commission),
                applied_to_policy_state: step.applied_to_policy_state,
                after_control: holdings(&step.after_control),
                after: holdings(&step.state_after),
            })
            .collect();

        let final_holdings = problem
            .assets
            .iter()
            .zip(trajectory.final_state.holdings())
            .map(|(asset, amount)| FinalHolding {
                name: asset.name.clone(),
                amount: problem.to_units(amount),
                minimum: problem.to_units(asset.minimum),
            })
            .collect();

        Self {
            title: "Three-Stage Reallocation Plan".to_string(),
            run_id: stats.run_id.clone(),
            generated_at: Utc::now(),
            start: holdings(&trajectory.start),
            stages,
            final_holdings,
            final_cash: problem.to_units(trajectory.final_state.free_cash),
            final_value: problem.to_units(trajectory.final_value),
            total_commission: problem.to_units(trajectory.total_commission),
            root_value: stats.root_value / problem.minor_per_unit as f64,
            reachable_sizes: stats.reachable_sizes.clone(),
        }
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str(&format!("                {}\n", self.title));
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!("  Run:            {}\n", self.run_id));
        report.push_str(&format!(
            "  Generated:      {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        report.push_str(&format!(
            "  Reachable:      {}\n\n",
            self.reachable_sizes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" / ")
        ));

        report.push_str(&format!("  Start:          {}\n\n", fmt_holdings(&self.start)));

        for stage in &self.stages {
            report.push_str(&format!("Stage {}\n", stage.stage));
            report.push_str("───────────────────────────────────────────────────────────────\n");
            report.push_str(&format!("  Before:         {}\n", fmt_holdings(&stage.before)));
            if stage.policy_state != stage.before {
                report.push_str(&format!(
                    "  Policy state:   {}\n",
                    fmt_holdings(&stage.policy_state)
                ));
            }
            report.push_str(&format!(
                "  Control:        ({}, {}, {}){}\n",
                fmt_delta(stage.control.asset1),
                fmt_delta(stage.control.asset2),
                fmt_delta(stage.control.deposit),
                if stage.applied_to_policy_state {
                    "  [applied to policy state]"
                } else {
                    ""
                }
            ));
            report.push_str(&format!("  Commission:     {:>12.2}\n", stage.commission));
            report.push_str(&format!(
                "  After trade:    {}\n",
                fmt_holdings(&stage.after_control)
            ));
            report.push_str(&format!("  After market:   {}\n\n", fmt_holdings(&stage.after)));
        }

        report.push_str("Final position\n");
        report.push_str("───────────────────────────────────────────────────────────────\n");
        for holding in &self.final_holdings {
            report.push_str(&format!(
                "  {:<15} {:>12.2}   (min {:.2})\n",
                format!("{}:", holding.name),
                holding.amount,
                holding.minimum
            ));
        }
        report.push_str(&format!("  {:<15} {:>12.2}\n", "Free cash:", self.final_cash));
        report.push_str(&format!("  {:<15} {:>12.2}\n", "Total value:", self.final_value));
        report.push_str(&format!(
            "  {:<15} {:>12.2}\n",
            "Commission:", self.total_commission
        ));
        report.push_str(&format!(
            "  {:<15} {:>12.2}\n",
            "Expected value:", self.root_value
        ));

        report.push_str("\n═══════════════════════════════════════════════════════════════\n");

        report
    }

    /// Format as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn fmt_holdings(h: &Holdings) -> String {
    format!(
        "({:.2}, {:.2}, {:.2}, cash {:.2})",
        h.asset1, h.asset2, h.deposit, h.free_cash
    )
}

fn fmt_delta(amount: f64) -> String {
    format!("{amount:+.2}")
}

// ============================================================================
// Tests
// ============================================================================

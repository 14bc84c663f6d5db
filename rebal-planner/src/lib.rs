//! Rebal Planner Library
//!
//! Plans the reallocation of a small portfolio (two securities, a deposit and
//! free cash) over three decision stages with discrete scenario outcomes,
//! maximizing the expected liquidation value at the horizon.
//!
//! # Pipeline
//!
//! ```text
//! PortfolioConfig ──validate/compile──▶ Problem
//!                                         │
//!                 ┌───────────────────────┴──────────────────────┐
//!                 ▼                                              │
//!        Reachability (forward)  ──▶  Bellman pass (backward)    │
//!                                            │                   │
//!                                            ▼                   ▼
//!                                  value / policy tables ──▶ expected-path replay
//!                                                                │
//!                                                                ▼
//!                                                           PlanReport
//! ```
//!
//! # Key Concepts
//!
//! ## Integer money
//! - Amounts are `i64` minor units, rates are parts-per-million
//! - Commission is rounded half up per instrument, then summed
//!
//! ## Quantization
//! - Every state is snapped onto a per-dimension grid so reachable sets stay
//!   finite and table lookups are exact
//!
//! ## Controls
//! - The no-op, one corner sell per instrument, and every affordable buy
//!   combination, in a fixed order that decides ties

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dp;
pub mod error;
pub mod model;
pub mod report;

pub use dp::{Planner, SolveStats, StageStep, Trajectory};
pub use error::PlanError;
pub use model::{AssetParams, Control, Outcome, Problem, Stage, State, ASSET_COUNT};
pub use report::PlanReport;

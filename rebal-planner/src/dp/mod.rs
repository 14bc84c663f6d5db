//! Stochastic dynamic programming over quantized portfolio states.
//!
//! Forward reachability, then a backward Bellman pass, then an expected-path
//! replay of the resulting policy.

pub mod controls;
pub mod quantizer;
pub mod reachability;
pub mod simulator;
pub mod solver;
pub mod transition;

pub use controls::ControlGenerator;
pub use quantizer::Quantizer;
pub use reachability::ReachabilityBuilder;
pub use simulator::{StageStep, Trajectory};
pub use solver::{Planner, SolveStats};
pub use transition::Transition;

//! Convergence engine: diffs desired vs observed state and applies it.
//!
//! The `planner` module decides which guarded steps a pass needs. The
//! `executor` module probes, re-checks each guard immediately before its step
//! and runs the step through the admin client.

pub mod executor;
pub mod planner;

pub use executor::{ConvergeOutcome, Converger, StepReport, StepStatus};
pub use planner::{plan, Guard, Plan, PlannedStep, StepKind};

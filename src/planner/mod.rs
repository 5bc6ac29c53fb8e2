//! Planning module for sync operations.
//!
//! This module compares desired resources against live state and produces a
//! deterministic, dependency-ordered plan, then applies it:
//! - [`StateFetcher`] reads live state concurrently
//! - [`Differ`] classifies each resource as create, replace, skip or delete
//! - [`DependencyOrderer`] orders actions by expression references
//! - [`PlanExecutor`] applies the plan in order

mod diff;
mod executor;
mod fetch;
mod order;
mod plan;

pub use diff::{Differ, Snapshot};
pub use executor::{ActionResult, ApplyReport, PlanExecutor};
pub use fetch::StateFetcher;
pub use order::DependencyOrderer;
pub use plan::{ActionKind, ActionReport, Plan, PlanReport, PlanSummary, PlannedAction};

// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Kaskada Sync
//!
//! Declarative sync of Kaskada tables, views and materializations.
//!
//! ## Overview
//!
//! A sync spec declares the resources a Kaskada instance should have. The
//! planner compares that desired set with the live system and produces a
//! deterministic plan, one action per resource:
//!
//! - **skip**: the live version is identical after normalization
//! - **create**: the resource does not exist yet
//! - **replace**: the live version differs (the API has no in-place update)
//! - **delete**: the resource exists but is not declared (with `--prune`)
//!
//! Actions are ordered so that a view is created after the tables and views
//! its expression references. The plan renders as stable log lines that
//! downstream tooling can grep for.
//!
//! ## Modules
//!
//! - [`resource`]: Resource payloads, field schema, normalization
//! - [`config`]: Sync spec parsing and validation, client settings
//! - [`client`]: Kaskada API clients
//! - [`planner`]: State fetching, diffing, ordering and execution
//! - [`reconciler`]: Plan and apply entry points
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! tables:
//!   - tableName: purchases
//!     timeColumnName: purchase_time
//!     entityKeyColumnName: customer_id
//! views:
//!   - viewName: max_amount
//!     expression: purchases.amount | max()
//! materializations:
//!   - materializationName: max_amount_export
//!     query: "{ max: max_amount }"
//!     destination:
//!       objectStore:
//!         format: FILE_FORMAT_PARQUET
//!         outputPrefixUri: s3://bucket/exports
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod resource;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use client::{ClientRegistry, HttpResourceClient, ResourceClient};
pub use config::{ClientSettings, SpecHasher, SpecParser, SpecValidator, SyncSpec};
pub use error::{KaskadaError, Result};
pub use planner::{ApplyReport, Plan, PlanExecutor, PlannedAction};
pub use reconciler::Reconciler;
pub use resource::{Resource, ResourceKind, ResourceRef};

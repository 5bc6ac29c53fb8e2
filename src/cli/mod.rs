//! CLI module for the Kaskada sync tool.
//!
//! This module provides the command-line interface for planning and applying
//! sync specs and inspecting resources.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, ResourceCommands, SpecArgs, SyncCommands};
pub use output::OutputFormatter;

//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::client::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS, ListOptions};
use crate::config::{ClientSettings, DEFAULT_CONCURRENCY, DEFAULT_ENDPOINT};
use crate::resource::ResourceKind;

/// Kaskada - declarative sync of tables, views and materializations.
#[derive(Parser, Debug)]
#[command(name = "kaskada")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// API endpoint.
    #[arg(long, global = true, env = "KASKADA_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Client identifier sent with every request.
    #[arg(long, global = true, env = "KASKADA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// API key, sent as a bearer token.
    #[arg(long, global = true, env = "KASKADA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Maximum concurrent lookups while planning.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan or apply a sync spec.
    Sync {
        /// Sync subcommand.
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Inspect tables.
    Table {
        /// Table subcommand.
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Inspect views.
    View {
        /// View subcommand.
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Inspect materializations.
    Materialization {
        /// Materialization subcommand.
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Show the field schema of a resource kind.
    Schema {
        /// Resource kind.
        kind: ResourceKind,
    },
}

/// Sync subcommands.
#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Show what a sync would do, without changing anything.
    Plan {
        /// Spec file selection.
        #[command(flatten)]
        spec: SpecArgs,

        /// Show changed fields per action.
        #[arg(short, long)]
        detailed: bool,

        /// Write a JSON summary of the plan to this path.
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Plan, confirm and apply a sync.
    Apply {
        /// Spec file selection.
        #[command(flatten)]
        spec: SpecArgs,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Refuse to apply unless the plan fingerprint starts with this value.
        #[arg(long)]
        fingerprint: Option<String>,
    },
}

/// Spec file and pruning flags shared by `plan` and `apply`.
#[derive(Args, Debug, Clone)]
pub struct SpecArgs {
    /// Path to the sync spec (searched upward from the working directory
    /// when omitted).
    #[arg(short, long, env = "KASKADA_SYNC_FILE")]
    pub file: Option<PathBuf>,

    /// Delete resources on the system that the spec does not declare.
    #[arg(long)]
    pub prune: bool,
}

/// Per-kind inspection subcommands.
#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// List resources.
    List {
        /// Only names containing this string.
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of resources to return.
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Continue from the token printed by a previous `list`.
        #[arg(long)]
        page_token: Option<String>,

        /// Show full details instead of names only.
        #[arg(short = 'a', long)]
        all_details: bool,
    },

    /// Show one resource.
    Get {
        /// Resource name.
        name: String,
    },
}

impl ResourceCommands {
    /// List options for a `list` invocation.
    #[must_use]
    pub fn list_options(&self) -> Option<ListOptions> {
        match self {
            Self::List {
                search,
                page_size,
                page_token,
                ..
            } => Some(ListOptions {
                search: search.clone(),
                page_size: *page_size,
                page_token: page_token.clone(),
            }),
            Self::Get { .. } => None,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Client settings from the global flags.
    #[must_use]
    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            endpoint: self.endpoint.clone(),
            client_id: self.client_id.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
            concurrency: self.concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_plan_flags() {
        let cli = Cli::try_parse_from([
            "kaskada",
            "sync",
            "plan",
            "--file",
            "spec.yaml",
            "--prune",
            "--summary",
            "out.json",
        ])
        .unwrap();

        let Commands::Sync {
            command:
                SyncCommands::Plan {
                    spec,
                    detailed,
                    summary,
                },
        } = cli.command
        else {
            panic!("expected sync plan");
        };
        assert_eq!(spec.file, Some(PathBuf::from("spec.yaml")));
        assert!(spec.prune);
        assert!(!detailed);
        assert_eq!(summary, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kaskada",
            "view",
            "list",
            "--endpoint",
            "https://kaskada.example.com",
            "--concurrency",
            "2",
            "--output",
            "json",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.endpoint, "https://kaskada.example.com");
        assert_eq!(settings.concurrency, 2);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_list_options() {
        let cli = Cli::try_parse_from(["kaskada", "table", "list", "-s", "purch", "-p", "25", "-a"])
            .unwrap();
        let Commands::Table { command } = cli.command else {
            panic!("expected table command");
        };
        let options = command.list_options().unwrap();
        assert_eq!(options.search.as_deref(), Some("purch"));
        assert_eq!(options.page_size, 25);
        assert!(options.page_token.is_none());
        assert!(matches!(command, ResourceCommands::List { all_details: true, .. }));
    }

    #[test]
    fn test_list_long_flags() {
        let cli = Cli::try_parse_from([
            "kaskada",
            "view",
            "list",
            "--all-details",
            "--page-token",
            "next",
        ])
        .unwrap();
        let Commands::View { command } = cli.command else {
            panic!("expected view command");
        };
        assert_eq!(command.list_options().unwrap().page_token.as_deref(), Some("next"));
        assert!(matches!(command, ResourceCommands::List { all_details: true, .. }));
    }

    #[test]
    fn test_list_page_size_default() {
        let cli = Cli::try_parse_from(["kaskada", "materialization", "list"]).unwrap();
        let Commands::Materialization { command } = cli.command else {
            panic!("expected materialization command");
        };
        assert_eq!(command.list_options().unwrap().page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_schema_kind() {
        let cli = Cli::try_parse_from(["kaskada", "schema", "materialization"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Schema {
                kind: ResourceKind::Materialization
            }
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["kaskada", "schema", "cluster"]).is_err());
    }
}

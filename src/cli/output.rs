//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::SpecHasher;
use crate::planner::{ActionKind, ApplyReport, Plan};
use crate::resource::{FieldRole, Presence, Resource, ResourceKind};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

/// Resource row for `list -a`.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Schema row for the `schema` command.
#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Field")]
    path: &'static str,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Optional")]
    optional: &'static str,
    #[tabled(rename = "Sensitive")]
    sensitive: &'static str,
    #[tabled(rename = "Default")]
    default: &'static str,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Summary line shown after the plan lines.
    #[must_use]
    pub fn format_plan_summary(&self, plan: &Plan) -> String {
        let summary = plan.summary();
        match self.format {
            OutputFormat::Json => serde_json::to_string(&summary).unwrap_or_default(),
            OutputFormat::Text => {
                if !plan.has_changes() {
                    return format!(
                        "{} No changes. {} resources up to date.",
                        "✓".green(),
                        summary.skip
                    );
                }
                format!(
                    "Plan: {} to create, {} to replace, {} to delete, {} unchanged (fingerprint {})",
                    summary.create.to_string().green(),
                    summary.replace.to_string().yellow(),
                    summary.delete.to_string().red(),
                    summary.skip,
                    SpecHasher::new().short_hash(&plan.fingerprint()).dimmed()
                )
            }
        }
    }

    /// Per-action table including changed fields.
    #[must_use]
    pub fn format_plan_detail(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&plan.report()).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<PlanActionRow> = plan
                    .actions
                    .iter()
                    .enumerate()
                    .map(|(i, a)| PlanActionRow {
                        index: i + 1,
                        action: Self::format_action_kind(a.kind),
                        kind: a.reference.kind.label(),
                        name: a.reference.name.clone(),
                        changed: a.changed_fields.join(", "),
                    })
                    .collect();
                Table::new(rows).to_string()
            }
        }
    }

    /// Formats a list of resources: names only, or a detail table with `all_details`.
    #[must_use]
    pub fn format_list(&self, resources: &[Resource], all_details: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                if all_details {
                    serde_json::to_string_pretty(resources).unwrap_or_default()
                } else {
                    let names: Vec<&str> = resources.iter().map(Resource::name).collect();
                    serde_json::to_string_pretty(&names).unwrap_or_default()
                }
            }
            OutputFormat::Text => {
                if all_details {
                    let rows: Vec<ResourceRow> = resources
                        .iter()
                        .map(|r| ResourceRow {
                            name: r.name().to_owned(),
                            detail: Self::truncate(&r.describe(), 80),
                        })
                        .collect();
                    Table::new(rows).to_string()
                } else {
                    let mut output = String::new();
                    for resource in resources {
                        let _ = writeln!(output, "{}", resource.name());
                    }
                    output
                }
            }
        }
    }

    /// Formats one resource in full.
    #[must_use]
    pub fn format_resource(&self, resource: &Resource) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(resource).unwrap_or_default(),
            OutputFormat::Text => serde_yaml::to_string(resource).unwrap_or_default(),
        }
    }

    /// Formats the field schema of `kind`.
    #[must_use]
    pub fn format_schema(&self, kind: ResourceKind) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(kind.schema()).unwrap_or_default(),
            OutputFormat::Text => {
                let rows: Vec<SchemaRow> = kind
                    .schema()
                    .iter()
                    .map(|field| SchemaRow {
                        path: field.path,
                        kind: field.kind.to_string(),
                        optional: match (field.role, field.presence) {
                            (FieldRole::ServerAssigned, _) => "server",
                            (FieldRole::User, Presence::Optional) => "yes",
                            (FieldRole::User, Presence::Required) => "no",
                        },
                        sensitive: if field.sensitive { "yes" } else { "" },
                        default: field.default.unwrap_or(""),
                    })
                    .collect();
                format!("{}\n{}", kind.type_name(), Table::new(rows))
            }
        }
    }

    /// Formats the outcome of an apply run.
    #[must_use]
    pub fn format_apply(&self, report: &ApplyReport) -> String {
        let created = report.count(ActionKind::Create);
        let replaced = report.count(ActionKind::Replace);
        let deleted = report.count(ActionKind::Delete);
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "created": created,
                "replaced": replaced,
                "deleted": deleted,
                "unchanged": report.skipped,
            })
            .to_string(),
            OutputFormat::Text => format!(
                "{} Apply complete: {created} created, {replaced} replaced, {deleted} deleted, {} unchanged",
                "✓".green(),
                report.skipped
            ),
        }
    }

    /// Formats an action kind with color.
    fn format_action_kind(kind: ActionKind) -> String {
        match kind {
            ActionKind::Create => "+create".green().to_string(),
            ActionKind::Replace => "~replace".yellow().to_string(),
            ActionKind::Delete => "-delete".red().to_string(),
            ActionKind::Skip => "skip".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{ActionResult, PlannedAction};
    use crate::resource::{Table as TableResource, View};

    fn table(name: &str) -> Resource {
        TableResource {
            table_name: name.to_owned(),
            time_column_name: String::from("time"),
            entity_key_column_name: String::from("key"),
            ..TableResource::default()
        }
        .into()
    }

    fn view(name: &str) -> Resource {
        View {
            view_name: name.to_owned(),
            expression: String::from("t.x"),
            ..View::default()
        }
        .into()
    }

    fn plan() -> Plan {
        Plan::new(
            vec![
                PlannedAction::skip(table("t"), table("t")),
                PlannedAction::replace(view("v"), view("v"), vec![String::from("expression")]),
            ],
            String::from("abc"),
        )
    }

    #[test]
    fn test_plan_summary_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_plan_summary(&plan());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["replace"], 1);
        assert_eq!(value["skip"], 1);
    }

    #[test]
    fn test_plan_summary_text() {
        let output = OutputFormatter::new(OutputFormat::Text).format_plan_summary(&plan());
        assert!(output.starts_with("Plan: "));
        assert!(output.contains("1 unchanged"));
        assert!(output.contains(&plan().fingerprint()[..12]));
    }

    #[test]
    fn test_plan_detail_lists_changed_fields() {
        let output = OutputFormatter::new(OutputFormat::Text).format_plan_detail(&plan());
        assert!(output.contains("expression"));
        assert!(output.contains("view"));
    }

    #[test]
    fn test_list_names_only() {
        let output =
            OutputFormatter::new(OutputFormat::Text).format_list(&[table("a"), table("b")], false);
        assert_eq!(output, "a\nb\n");
    }

    #[test]
    fn test_list_all_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_list(&[view("v")], true);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["viewName"], "v");
        assert_eq!(value[0]["expression"], "t.x");
    }

    #[test]
    fn test_resource_text_is_yaml() {
        let output = OutputFormatter::new(OutputFormat::Text).format_resource(&view("v"));
        assert!(output.contains("viewName: v"));
    }

    #[test]
    fn test_schema_table() {
        let output =
            OutputFormatter::new(OutputFormat::Text).format_schema(ResourceKind::Materialization);
        assert!(output.starts_with("*kaskadav1alpha.Materialization"));
        assert!(output.contains("destination.redis.password"));
        assert!(output.contains("6379"));
    }

    #[test]
    fn test_schema_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_schema(ResourceKind::View);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[1]["path"], "viewName");
        assert_eq!(value[1]["presence"], "required");
    }

    #[test]
    fn test_apply_json() {
        let report = ApplyReport {
            results: vec![ActionResult {
                reference: table("t").reference(),
                kind: ActionKind::Create,
                stored: None,
            }],
            skipped: 2,
        };
        let output = OutputFormatter::new(OutputFormat::Json).format_apply(&report);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["created"], 1);
        assert_eq!(value["unchanged"], 2);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghijkl", 8), "abcde...");
    }
}

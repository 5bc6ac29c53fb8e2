//! Plan executor for applying sync plans.
//!
//! Actions run strictly in plan order. The first failed mutation stops the
//! run; actions already applied are reported, never rolled back.

use tracing::{debug, error, info};

use crate::client::ClientRegistry;
use crate::error::{ApiError, ApplyError, Result};
use crate::resource::{Resource, ResourceRef};

use super::plan::{ActionKind, Plan, PlannedAction};

/// Executor for sync plans.
#[derive(Debug)]
pub struct PlanExecutor<'a> {
    registry: &'a ClientRegistry,
}

/// Result of one applied action.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Resource the action applied to.
    pub reference: ResourceRef,
    /// Action type.
    pub kind: ActionKind,
    /// Version stored by the system (create and replace).
    pub stored: Option<Resource>,
}

/// Result of applying a whole plan.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Mutations performed, in order.
    pub results: Vec<ActionResult>,
    /// Number of actions skipped as unchanged.
    pub skipped: usize,
}

impl ApplyReport {
    /// Number of mutations performed.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.results.len()
    }

    /// Mutations of the given kind.
    #[must_use]
    pub fn count(&self, kind: ActionKind) -> usize {
        self.results.iter().filter(|r| r.kind == kind).count()
    }
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(registry: &'a ClientRegistry) -> Self {
        Self { registry }
    }

    /// Applies `plan` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::MutationFailed`] for the first mutation the
    /// system rejects, listing the mutations that completed before it.
    pub async fn execute(&self, plan: &Plan) -> Result<ApplyReport> {
        info!("Applying sync plan with {} actions", plan.actions.len());

        let mut report = ApplyReport::default();
        for action in &plan.actions {
            if action.kind == ActionKind::Skip {
                debug!(kind = %action.reference.kind, name = %action.reference.name, "Unchanged");
                report.skipped += 1;
                continue;
            }

            match self.apply(action).await {
                Ok(stored) => {
                    info!(
                        kind = %action.reference.kind,
                        name = %action.reference.name,
                        action = %action.kind,
                        "Applied"
                    );
                    report.results.push(ActionResult {
                        reference: action.reference.clone(),
                        kind: action.kind,
                        stored,
                    });
                }
                Err(e) => {
                    error!(
                        kind = %action.reference.kind,
                        name = %action.reference.name,
                        "{} failed: {e}", action.kind
                    );
                    let succeeded = report
                        .results
                        .iter()
                        .map(|r| format!("{} {}", r.kind, r.reference))
                        .collect();
                    return Err(ApplyError::MutationFailed {
                        action: action.description(),
                        reason: e.to_string(),
                        succeeded,
                    }
                    .into());
                }
            }
        }

        info!(
            applied = report.applied(),
            skipped = report.skipped,
            "Sync plan applied"
        );
        Ok(report)
    }

    async fn apply(&self, action: &PlannedAction) -> std::result::Result<Option<Resource>, ApiError> {
        let client = self.registry.client(action.reference.kind)?;
        let name = action.reference.name.as_str();
        match (action.kind, &action.desired) {
            (ActionKind::Create, Some(desired)) => client.create(desired).await.map(Some),
            (ActionKind::Replace, Some(desired)) => client.replace(name, desired).await.map(Some),
            (ActionKind::Delete, _) => client.delete(name).await.map(|()| None),
            (ActionKind::Create | ActionKind::Replace, None) => Err(ApiError::invalid_response(
                format!("{} has no desired definition", action.description()),
            )),
            (ActionKind::Skip, _) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::MemoryStore;
    use crate::error::KaskadaError;
    use crate::resource::{ResourceKind, Table, View};

    fn table(name: &str) -> Resource {
        Table {
            table_name: name.to_owned(),
            time_column_name: String::from("time"),
            entity_key_column_name: String::from("key"),
            ..Table::default()
        }
        .into()
    }

    fn view(name: &str, expression: &str) -> Resource {
        View {
            view_name: name.to_owned(),
            expression: expression.to_owned(),
            ..View::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_execute_in_order() {
        let store = MemoryStore::new();
        store.insert(view("v", "t.old"));
        store.insert(table("gone"));
        store.insert(table("same"));

        let plan = Plan::new(
            vec![
                PlannedAction::create(table("t")),
                PlannedAction::skip(table("same"), table("same")),
                PlannedAction::replace(view("v", "t.new"), view("v", "t.old"), vec![]),
                PlannedAction::delete(table("gone")),
            ],
            String::new(),
        );

        let registry = store.registry();
        let report = PlanExecutor::new(&registry).execute(&plan).await.unwrap();

        assert_eq!(
            store.calls(),
            vec!["create t", "delete v", "create v", "delete gone"]
        );
        assert_eq!(report.applied(), 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.count(ActionKind::Replace), 1);
        assert!(report.results[0].stored.is_some());
        assert!(report.results[2].stored.is_none());
        assert!(!store.contains(ResourceKind::Table, "gone"));
    }

    #[tokio::test]
    async fn test_failure_stops_and_reports_progress() {
        let store = MemoryStore::new();
        store.fail_on("create v2");

        let plan = Plan::new(
            vec![
                PlannedAction::create(view("v1", "t.x")),
                PlannedAction::create(view("v2", "v1")),
                PlannedAction::create(view("v3", "v2")),
            ],
            String::new(),
        );

        let registry = store.registry();
        let err = PlanExecutor::new(&registry).execute(&plan).await.unwrap_err();

        match err {
            KaskadaError::Apply(ApplyError::MutationFailed {
                action, succeeded, ..
            }) => {
                assert_eq!(action, "create kind=*kaskadav1alpha.View name=v2");
                assert_eq!(succeeded, vec!["create kind=*kaskadav1alpha.View name=v1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.contains(ResourceKind::View, "v1"));
        assert!(!store.contains(ResourceKind::View, "v3"));
        assert_eq!(store.calls(), vec!["create v1"]);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let registry = MemoryStore::new().registry();
        let report = PlanExecutor::new(&registry)
            .execute(&Plan::new(Vec::new(), String::new()))
            .await
            .unwrap();
        assert_eq!(report.applied(), 0);
    }
}

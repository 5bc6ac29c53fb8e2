//! Diff engine for comparing desired and live resources.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use super::plan::PlannedAction;
use crate::resource::{Resource, ResourceRef, changed_fields};

/// Live versions of the resources involved in a planning pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Live version of each desired resource that exists on the system.
    pub found: BTreeMap<ResourceRef, Resource>,
    /// Every resource on the system, when listing was requested for pruning.
    pub inventory: Option<BTreeMap<ResourceRef, Resource>>,
}

impl Snapshot {
    /// Live version of `reference`, if it exists.
    #[must_use]
    pub fn get(&self, reference: &ResourceRef) -> Option<&Resource> {
        self.found.get(reference).or_else(|| {
            self.inventory
                .as_ref()
                .and_then(|inventory| inventory.get(reference))
        })
    }
}

/// Classifies each desired resource against its live version.
#[derive(Debug, Default)]
pub struct Differ {
    prune: bool,
}

impl Differ {
    /// Creates a differ; with `prune`, live resources absent from the spec
    /// are planned for deletion.
    #[must_use]
    pub const fn new(prune: bool) -> Self {
        Self { prune }
    }

    /// Computes one action per desired resource, plus one delete per pruned
    /// resource. The result is in declaration order followed by deletes in
    /// `(kind, name)` order; ordering by dependency happens later.
    #[must_use]
    pub fn diff(&self, desired: &[Resource], snapshot: &Snapshot) -> Vec<PlannedAction> {
        let mut actions = Vec::with_capacity(desired.len());

        for resource in desired {
            let reference = resource.reference();
            let action = match snapshot.get(&reference) {
                None => PlannedAction::create(resource.clone()),
                Some(actual) => {
                    let changed = changed_fields(resource, actual);
                    if changed.is_empty() {
                        PlannedAction::skip(resource.clone(), actual.clone())
                    } else {
                        trace!(%reference, fields = ?changed, "Resource differs");
                        PlannedAction::replace(resource.clone(), actual.clone(), changed)
                    }
                }
            };
            actions.push(action);
        }

        if self.prune
            && let Some(inventory) = &snapshot.inventory
        {
            let declared: BTreeSet<ResourceRef> = desired.iter().map(Resource::reference).collect();
            for (reference, actual) in inventory {
                if !declared.contains(reference) {
                    actions.push(PlannedAction::delete(actual.clone()));
                }
            }
        }

        debug!(actions = actions.len(), "Diff computed");
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ActionKind;
    use crate::resource::{Table, View};

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

    fn live_view(name: &str, expression: &str) -> Resource {
        View {
            view_id: Some(String::from("id-1")),
            view_name: name.to_owned(),
            expression: expression.to_owned(),
            analysis: Some(serde_json::json!({ "canExecute": true })),
            ..View::default()
        }
        .into()
    }

    fn snapshot(found: Vec<Resource>) -> Snapshot {
        Snapshot {
            found: found.into_iter().map(|r| (r.reference(), r)).collect(),
            inventory: None,
        }
    }

    #[test]
    fn test_missing_resource_is_created() {
        let actions = Differ::default().diff(&[table("t")], &Snapshot::default());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Create);
        assert!(actions[0].actual.is_none());
    }

    #[test]
    fn test_server_fields_do_not_cause_replace() {
        let actions = Differ::default().diff(
            &[view("v", "t.x")],
            &snapshot(vec![live_view("v", "t.x")]),
        );
        assert_eq!(actions[0].kind, ActionKind::Skip);
    }

    #[test]
    fn test_changed_expression_is_replaced() {
        let actions = Differ::default().diff(
            &[view("v", "t.y")],
            &snapshot(vec![live_view("v", "t.x")]),
        );
        assert_eq!(actions[0].kind, ActionKind::Replace);
        assert_eq!(actions[0].changed_fields, vec![String::from("expression")]);
    }

    #[test]
    fn test_prune_deletes_undeclared() {
        let mut snap = snapshot(vec![table("t")]);
        snap.inventory = Some(
            [table("t"), table("old"), view("stale", "t.x")]
                .into_iter()
                .map(|r| (r.reference(), r))
                .collect(),
        );

        let actions = Differ::new(true).diff(&[table("t")], &snap);
        let rendered: Vec<String> = actions.iter().map(PlannedAction::description).collect();
        assert_eq!(
            rendered,
            vec![
                "skip kind=*kaskadav1alpha.Table name=t",
                "delete kind=*kaskadav1alpha.Table name=old",
                "delete kind=*kaskadav1alpha.View name=stale",
            ]
        );
    }

    #[test]
    fn test_without_prune_inventory_is_ignored() {
        let snap = Snapshot {
            found: BTreeMap::new(),
            inventory: Some([(table("old").reference(), table("old"))].into()),
        };
        let actions = Differ::default().diff(&[], &snap);
        assert!(actions.is_empty());
    }
}

//! Sync plan types and rendering.
//!
//! A plan is an ordered list of actions, one per desired resource plus one
//! per pruned resource. Rendering is a pure function of the action list.

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::config::SpecHasher;
use crate::error::ApplyError;
use crate::resource::{Resource, ResourceRef};

/// What the apply path would do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Resource is absent on the system.
    Create,
    /// Resource differs from the version on the system.
    Replace,
    /// Resource is identical to the version on the system.
    Skip,
    /// Resource is on the system but not in the spec (prune only).
    Delete,
}

impl ActionKind {
    /// Log message for this action, as rendered before the resource fields.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Create => "resource not found on system, will create it",
            Self::Replace => "resource different than version on system, will replace it",
            Self::Skip => "resource identical to version on system, will skip it",
            Self::Delete => "resource present on system but not in spec, will delete it",
        }
    }

    /// True if applying this action calls the API.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Skip)
    }

    /// True if this action writes a new definition.
    #[must_use]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Create | Self::Replace)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Replace => "replace",
            Self::Skip => "skip",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    /// Resource the action applies to.
    pub reference: ResourceRef,
    /// Action type.
    pub kind: ActionKind,
    /// Why the action was chosen.
    pub reason: String,
    /// Desired definition (create, replace, skip).
    pub desired: Option<Resource>,
    /// Live version (replace, skip, delete).
    pub actual: Option<Resource>,
    /// Fields that differ (replace only).
    pub changed_fields: Vec<String>,
}

impl PlannedAction {
    fn new(
        kind: ActionKind,
        reference: ResourceRef,
        desired: Option<Resource>,
        actual: Option<Resource>,
        changed_fields: Vec<String>,
    ) -> Self {
        Self {
            reference,
            kind,
            reason: kind.message().to_owned(),
            desired,
            actual,
            changed_fields,
        }
    }

    /// Desired resource that does not exist yet.
    #[must_use]
    pub fn create(desired: Resource) -> Self {
        Self::new(ActionKind::Create, desired.reference(), Some(desired), None, Vec::new())
    }

    /// Desired resource whose live version differs in `changed_fields`.
    #[must_use]
    pub fn replace(desired: Resource, actual: Resource, changed_fields: Vec<String>) -> Self {
        Self::new(
            ActionKind::Replace,
            desired.reference(),
            Some(desired),
            Some(actual),
            changed_fields,
        )
    }

    /// Desired resource identical to its live version.
    #[must_use]
    pub fn skip(desired: Resource, actual: Resource) -> Self {
        Self::new(ActionKind::Skip, desired.reference(), Some(desired), Some(actual), Vec::new())
    }

    /// Live resource absent from the spec.
    #[must_use]
    pub fn delete(actual: Resource) -> Self {
        Self::new(ActionKind::Delete, actual.reference(), None, Some(actual), Vec::new())
    }

    /// The definition whose expressions determine this action's dependencies.
    #[must_use]
    pub fn definition(&self) -> Option<&Resource> {
        self.desired.as_ref().or(self.actual.as_ref())
    }

    /// Stable log line: message followed by the resource fields.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{} {}", self.reason, self.reference)
    }

    /// Short description used in apply progress and errors.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} {}", self.kind, self.reference)
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Counts per action kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Resources to create.
    pub create: usize,
    /// Resources to replace.
    pub replace: usize,
    /// Resources left unchanged.
    pub skip: usize,
    /// Resources to delete.
    pub delete: usize,
}

impl PlanSummary {
    /// Number of actions that call the API.
    #[must_use]
    pub const fn changes(&self) -> usize {
        self.create + self.replace + self.delete
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to replace, {} to delete, {} unchanged",
            self.create, self.replace, self.delete, self.skip
        )
    }
}

/// A complete, dependency-ordered sync plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
    /// Hash of the desired resources this plan was computed from.
    pub spec_hash: String,
}

impl Plan {
    /// Creates a plan from already-ordered actions.
    #[must_use]
    pub const fn new(actions: Vec<PlannedAction>, spec_hash: String) -> Self {
        Self { actions, spec_hash }
    }

    /// One line per action, in plan order.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.actions.iter().map(PlannedAction::render).collect()
    }

    /// Counts per action kind.
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        self.actions
            .iter()
            .fold(PlanSummary::default(), |mut summary, action| {
                match action.kind {
                    ActionKind::Create => summary.create += 1,
                    ActionKind::Replace => summary.replace += 1,
                    ActionKind::Skip => summary.skip += 1,
                    ActionKind::Delete => summary.delete += 1,
                }
                summary
            })
    }

    /// SHA-256 of the rendered lines; identifies a plan across runs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        SpecHasher::new().hash_lines(&self.render())
    }

    /// Fails unless the fingerprint matches `expected` (full or shortened).
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::FingerprintMismatch`] if the fingerprints differ.
    pub fn check_fingerprint(&self, expected: &str) -> Result<(), ApplyError> {
        let found = self.fingerprint();
        if SpecHasher::hashes_match(&found, expected) {
            Ok(())
        } else {
            Err(ApplyError::FingerprintMismatch {
                expected: expected.to_owned(),
                found,
            })
        }
    }

    /// Emits one `info` event per action, in plan order, with `kind` and
    /// `name` fields.
    pub fn log(&self) {
        for action in &self.actions {
            info!(
                kind = %action.reference.kind,
                name = %action.reference.name,
                "{}", action.reason
            );
        }
    }

    /// True if applying the plan would call the API.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.kind.is_mutation())
    }

    /// Returns true if the plan has no actions at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Machine-readable report, written by `plan --summary`.
    #[must_use]
    pub fn report(&self) -> PlanReport {
        PlanReport {
            spec_hash: self.spec_hash.clone(),
            fingerprint: self.fingerprint(),
            summary: self.summary(),
            actions: self
                .actions
                .iter()
                .map(|a| ActionReport {
                    action: a.kind,
                    kind: a.reference.kind.type_name(),
                    name: a.reference.name.clone(),
                    reason: a.reason.clone(),
                    changed_fields: a.changed_fields.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.render() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Serializable plan summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    /// Hash of the desired resources.
    pub spec_hash: String,
    /// Plan fingerprint.
    pub fingerprint: String,
    /// Counts per action kind.
    pub summary: PlanSummary,
    /// Actions in plan order.
    pub actions: Vec<ActionReport>,
}

/// One action in a [`PlanReport`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    /// Action type.
    pub action: ActionKind,
    /// Resource type identity.
    pub kind: &'static str,
    /// Resource name.
    pub name: String,
    /// Why the action was chosen.
    pub reason: String,
    /// Fields that differ (replace only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
}

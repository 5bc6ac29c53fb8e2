//! Reconciler for syncing desired resources with the system.
//!
//! This module ties the planning pipeline together: fetch live state, diff
//! it against the desired resources, order the actions by dependency, and
//! apply the resulting plan.

use tracing::debug;

use crate::client::ClientRegistry;
use crate::config::{DEFAULT_CONCURRENCY, SpecHasher};
use crate::error::Result;
use crate::planner::{ApplyReport, DependencyOrderer, Differ, Plan, PlanExecutor, StateFetcher};
use crate::resource::Resource;

/// Plans and applies sync runs against one system.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Clients per kind.
    registry: ClientRegistry,
    /// Maximum concurrent lookups.
    concurrency: usize,
    /// Whether undeclared live resources are deleted.
    prune: bool,
    /// Hasher for spec fingerprints.
    hasher: SpecHasher,
}

impl Reconciler {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(registry: ClientRegistry) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
            prune: false,
            hasher: SpecHasher::new(),
        }
    }

    /// Sets the maximum number of concurrent lookups.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Plans deletion of live resources absent from the desired set.
    #[must_use]
    pub const fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Computes the plan for `desired`. Never mutates the system.
    ///
    /// # Errors
    ///
    /// Returns an error if any lookup fails or the planned resources
    /// reference each other in a cycle. No partial plan is returned.
    pub async fn plan(&self, desired: &[Resource]) -> Result<Plan> {
        debug!(resources = desired.len(), prune = self.prune, "Planning sync");

        let snapshot = StateFetcher::new(self.registry.clone(), self.concurrency)
            .fetch(desired, self.prune)
            .await?;
        debug!(found = snapshot.found.len(), "Live state fetched");

        let actions = Differ::new(self.prune).diff(desired, &snapshot);
        let ordered = DependencyOrderer::new().order(actions)?;

        let plan = Plan::new(ordered, self.hasher.hash_resources(desired));
        debug!(
            spec_hash = %self.hasher.short_hash(&plan.spec_hash),
            summary = %plan.summary(),
            "Plan computed"
        );
        Ok(plan)
    }

    /// Applies `plan` in order.
    ///
    /// # Errors
    ///
    /// Returns an error for the first mutation the system rejects.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplyReport> {
        PlanExecutor::new(&self.registry).execute(plan).await
    }
}

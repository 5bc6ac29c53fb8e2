//! Concurrent lookup of live state.
//!
//! Each desired resource is fetched by name; with pruning, every kind is also
//! listed in full. Lookups run concurrently up to a fixed limit and the first
//! failure aborts the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::diff::Snapshot;
use crate::client::{ClientRegistry, ListOptions, list_all};
use crate::error::{KaskadaError, Result};
use crate::resource::{Resource, ResourceKind, ResourceRef};

/// Page size used when listing inventory for pruning.
const INVENTORY_PAGE_SIZE: u32 = 100;

/// Result of one lookup task.
enum Fetched {
    One(ResourceRef, Option<Resource>),
    Inventory(ResourceKind, Vec<Resource>),
}

/// Reads live state for a planning pass.
#[derive(Debug, Clone)]
pub struct StateFetcher {
    registry: ClientRegistry,
    concurrency: usize,
}

impl StateFetcher {
    /// Creates a fetcher running at most `concurrency` lookups at once.
    #[must_use]
    pub fn new(registry: ClientRegistry, concurrency: usize) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches the live version of every desired resource, and the full
    /// inventory of every kind when `prune` is set.
    ///
    /// # Errors
    ///
    /// Returns [`KaskadaError::Fetch`] naming the first lookup that failed.
    /// "Not found" is not a failure.
    pub async fn fetch(&self, desired: &[Resource], prune: bool) -> Result<Snapshot> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<Result<Fetched>> = JoinSet::new();

        for resource in desired {
            let reference = resource.reference();
            let client = self.registry.client(reference.kind)?;
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| KaskadaError::internal(e.to_string()))?;
                let found = client
                    .get(&reference.name)
                    .await
                    .map_err(|e| KaskadaError::fetch(reference.to_string(), e))?;
                Ok(Fetched::One(reference, found))
            });
        }

        if prune {
            for kind in ResourceKind::ALL {
                let client = self.registry.client(kind)?;
                let permits = Arc::clone(&permits);
                tasks.spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| KaskadaError::internal(e.to_string()))?;
                    let options = ListOptions {
                        page_size: INVENTORY_PAGE_SIZE,
                        ..ListOptions::default()
                    };
                    let items = list_all(client.as_ref(), &options)
                        .await
                        .map_err(|e| KaskadaError::fetch(format!("kind={kind} inventory"), e))?;
                    Ok(Fetched::Inventory(kind, items))
                });
            }
        }

        let mut snapshot = Snapshot {
            found: BTreeMap::new(),
            inventory: prune.then(BTreeMap::new),
        };

        while let Some(joined) = tasks.join_next().await {
            let fetched = match joined {
                Ok(Ok(fetched)) => fetched,
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(KaskadaError::internal(format!("lookup task failed: {e}")));
                }
            };

            match fetched {
                Fetched::One(reference, Some(actual)) => {
                    if actual.name() != reference.name {
                        warn!(%reference, returned = actual.name(), "Lookup returned a different name");
                    }
                    snapshot.found.insert(reference, actual);
                }
                Fetched::One(reference, None) => {
                    debug!(%reference, "Resource not found on system");
                }
                Fetched::Inventory(kind, items) => {
                    debug!(kind = %kind, count = items.len(), "Inventory listed");
                    if let Some(inventory) = snapshot.inventory.as_mut() {
                        inventory.extend(items.into_iter().map(|r| (r.reference(), r)));
                    }
                }
            }
        }

        Ok(snapshot)
    }
}

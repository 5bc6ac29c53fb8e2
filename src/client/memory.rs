//! In-memory resource client used by planner and apply tests.
//!
//! Behaves like the service: created resources come back with ids,
//! timestamps and versions filled in, and sensitive fields stripped.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{ClientRegistry, ListOptions, ListPage, ResourceClient};
use crate::error::ApiError;
use crate::resource::{Resource, ResourceKind};

/// Shared store behind every kind's client.
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: Mutex<BTreeMap<(ResourceKind, String), Resource>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a live resource without recording a call.
    pub fn insert(&self, resource: impl Into<Resource>) {
        let resource = resource.into();
        self.resources
            .lock()
            .unwrap()
            .insert((resource.kind(), resource.name().to_owned()), resource);
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.resources
            .lock()
            .unwrap()
            .contains_key(&(kind, name.to_owned()))
    }

    /// Mutations performed so far, as `"<verb> <name>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes the given mutation (`"create v"`) fail.
    pub fn fail_on(&self, call: &str) {
        self.failures.lock().unwrap().push(call.to_owned());
    }

    /// A registry with one client per kind over this store.
    pub fn registry(self: &Arc<Self>) -> ClientRegistry {
        ResourceKind::ALL
            .into_iter()
            .fold(ClientRegistry::new(), |registry, kind| {
                registry.with(Arc::new(MemoryClient {
                    kind,
                    store: Arc::clone(self),
                }))
            })
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        if self.failures.lock().unwrap().contains(&call) {
            return Err(ApiError::request(500, format!("injected failure for {call}")));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryClient {
    kind: ResourceKind,
    store: Arc<MemoryStore>,
}

/// Fills server-assigned fields and drops secrets, as the service does.
fn stored(resource: &Resource, id: usize) -> Resource {
    let now = Utc::now();
    let id = format!("{id:08x}");
    match resource.clone() {
        Resource::Table(mut t) => {
            t.table_id = Some(id);
            t.create_time = Some(now);
            t.update_time = Some(now);
            t.version = Some(0);
            if let Some(pulsar) = t.source.as_mut().and_then(|s| s.pulsar.as_mut()) {
                pulsar.config.auth_params.clear();
            }
            Resource::Table(t)
        }
        Resource::View(mut v) => {
            v.view_id = Some(id);
            v.create_time = Some(now);
            v.update_time = Some(now);
            v.analysis = Some(serde_json::json!({ "canExecute": true }));
            Resource::View(v)
        }
        Resource::Materialization(mut m) => {
            m.materialization_id = Some(id);
            m.create_time = Some(now);
            m.version = Some(1);
            m.schema = Some(serde_json::json!({ "fields": [] }));
            if let Some(redis) = m.destination.as_mut().and_then(|d| d.redis.as_mut()) {
                redis.password.clear();
                redis.tls_key.clear();
            }
            Resource::Materialization(m)
        }
    }
}

#[async_trait]
impl ResourceClient for MemoryClient {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get(&self, name: &str) -> Result<Option<Resource>, ApiError> {
        Ok(self
            .store
            .resources
            .lock()
            .unwrap()
            .get(&(self.kind, name.to_owned()))
            .cloned())
    }

    async fn list(&self, options: &ListOptions) -> Result<ListPage, ApiError> {
        let items = self
            .store
            .resources
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.kind() == self.kind)
            .filter(|r| options.search.as_deref().is_none_or(|s| r.name().contains(s)))
            .cloned()
            .collect();
        Ok(ListPage {
            items,
            next_page_token: None,
        })
    }

    async fn create(&self, resource: &Resource) -> Result<Resource, ApiError> {
        self.store.record(format!("create {}", resource.name()))?;
        let mut resources = self.store.resources.lock().unwrap();
        let key = (self.kind, resource.name().to_owned());
        if resources.contains_key(&key) {
            return Err(ApiError::request(409, format!("{} already exists", resource.name())));
        }
        let created = stored(resource, resources.len() + 1);
        resources.insert(key, created.clone());
        Ok(created)
    }

    async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.store.record(format!("delete {name}"))?;
        self.store
            .resources
            .lock()
            .unwrap()
            .remove(&(self.kind, name.to_owned()))
            .map(|_| ())
            .ok_or_else(|| ApiError::request(404, format!("{name} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::View;

    fn view(expression: &str) -> Resource {
        View {
            view_name: String::from("v"),
            expression: expression.to_owned(),
            ..View::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_replace_deletes_then_creates() {
        let store = MemoryStore::new();
        store.insert(view("t.old"));
        let client = store.registry().client(ResourceKind::View).unwrap();

        let replaced = client.replace("v", &view("t.new")).await.unwrap();

        assert_eq!(store.calls(), vec!["delete v", "create v"]);
        let Resource::View(replaced) = replaced else {
            panic!("expected a view");
        };
        assert_eq!(replaced.expression, "t.new");
        assert!(replaced.view_id.is_some());
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let store = MemoryStore::new();
        store.insert(view("t.x"));
        let client = store.registry().client(ResourceKind::View).unwrap();
        let err = client.create(&view("t.x")).await.unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 409, .. }));
    }
}

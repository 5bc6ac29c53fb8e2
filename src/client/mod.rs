//! Resource clients for the Kaskada API.
//!
//! One [`ResourceClient`] per [`ResourceKind`], resolved through a
//! [`ClientRegistry`]. The planner only reads; the apply path mutates.

mod http;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::resource::{Resource, ResourceKind};

pub use http::{DEFAULT_TIMEOUT_SECS, HttpResourceClient};

/// Default page size for list calls.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Options for a single list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Filter on names.
    pub search: Option<String>,
    /// Maximum items per page.
    pub page_size: u32,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            search: None,
            page_size: DEFAULT_PAGE_SIZE,
            page_token: None,
        }
    }
}

impl ListOptions {
    /// Options for the page following `token`.
    #[must_use]
    pub fn next_page(&self, token: impl Into<String>) -> Self {
        Self {
            page_token: Some(token.into()),
            ..self.clone()
        }
    }
}

/// One page of list results.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Resources on this page.
    pub items: Vec<Resource>,
    /// Token for the next page, if any.
    pub next_page_token: Option<String>,
}

/// CRUD capability for one resource kind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Kind served by this client.
    fn kind(&self) -> ResourceKind;

    /// Looks up a resource by name. `Ok(None)` means it does not exist.
    async fn get(&self, name: &str) -> Result<Option<Resource>, ApiError>;

    /// Lists one page of resources.
    async fn list(&self, options: &ListOptions) -> Result<ListPage, ApiError>;

    /// Creates a resource and returns the stored version.
    async fn create(&self, resource: &Resource) -> Result<Resource, ApiError>;

    /// Deletes a resource by name.
    async fn delete(&self, name: &str) -> Result<(), ApiError>;

    /// Replaces a resource wholesale.
    ///
    /// The API has no in-place update, so this deletes then recreates.
    async fn replace(&self, name: &str, resource: &Resource) -> Result<Resource, ApiError> {
        self.delete(name).await?;
        self.create(resource).await
    }
}

/// Lists every resource of `client`'s kind, following page tokens.
///
/// # Errors
///
/// Returns the first error raised by any page request.
pub async fn list_all(
    client: &dyn ResourceClient,
    options: &ListOptions,
) -> Result<Vec<Resource>, ApiError> {
    let mut items = Vec::new();
    let mut options = options.clone();
    loop {
        let page = client.list(&options).await?;
        items.extend(page.items);
        match page.next_page_token.filter(|token| !token.is_empty()) {
            Some(token) => options = options.next_page(token),
            None => return Ok(items),
        }
    }
}

/// Kind-keyed lookup of resource clients.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ResourceKind, Arc<dyn ResourceClient>>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("kinds", &self.clients.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client under its own kind, replacing any previous one.
    pub fn register(&mut self, client: Arc<dyn ResourceClient>) {
        self.clients.insert(client.kind(), client);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.register(client);
        self
    }

    /// HTTP clients for every kind, sharing one connection pool.
    #[must_use]
    pub fn http(base: &HttpResourceClient) -> Self {
        ResourceKind::ALL
            .into_iter()
            .fold(Self::new(), |registry, kind| {
                registry.with(Arc::new(base.for_kind(kind)))
            })
    }

    /// Client for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if no client was registered for `kind`.
    pub fn client(&self, kind: ResourceKind) -> Result<Arc<dyn ResourceClient>, ApiError> {
        self.clients
            .get(&kind)
            .cloned()
            .ok_or_else(|| ApiError::invalid_response(format!("no client registered for {kind}")))
    }
}

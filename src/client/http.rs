//! JSON-over-HTTP client for the Kaskada API.
//!
//! Speaks the REST gateway rendition of the `kaskada.v1alpha` services:
//! resources live under `/v1alpha/{tables|views|materializations}` and
//! payloads are wrapped in a single-key envelope (`{"table": {...}}`).

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{ListOptions, ListPage, ResourceClient};
use crate::error::ApiError;
use crate::resource::{Resource, ResourceKind};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Upper bound on a server-requested retry delay.
const MAX_RETRY_AFTER_SECS: u64 = 10;

/// gRPC `NOT_FOUND`, as carried in gateway error bodies.
const GRPC_NOT_FOUND: u64 = 5;

/// HTTP resource client bound to one kind.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    client: Client,
    base: Url,
    client_id: Option<String>,
    api_key: Option<String>,
    kind: ResourceKind,
}

impl HttpResourceClient {
    /// Creates a client for `base` (e.g. `http://localhost:3365`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base: Url, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            client_id: None,
            api_key: None,
            kind: ResourceKind::Table,
        })
    }

    /// Sets the `client-id` header sent with every request.
    #[must_use]
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id.filter(|id| !id.is_empty());
        self
    }

    /// Sets the bearer key sent with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    /// A copy of this client bound to `kind`, sharing the connection pool.
    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// `{base}/v1alpha/{collection}[/{name}]`, with `name` percent-encoded.
    fn url(&self, name: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::network(format!("Endpoint {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(["v1alpha", self.kind.collection()])
            .extend(name);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        if let Some(client_id) = &self.client_id {
            builder = builder.header("client-id", client_id);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {api_key}"));
        }
        builder
    }

    /// Sends a request, retrying transient failures of idempotent methods.
    ///
    /// Returns `None` when the gateway reports the resource as not found.
    async fn execute<F>(
        &self,
        method: Method,
        url: &Url,
        customize: F,
    ) -> Result<Option<Value>, ApiError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let attempts = if method.is_idempotent() { MAX_RETRIES } else { 1 };
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..attempts {
            if let Some(error) = &last_error {
                let secs = error.retry_delay_secs().unwrap_or(1).min(MAX_RETRY_AFTER_SECS);
                let delay = Duration::from_secs(secs * u64::from(attempt));
                debug!("Retry attempt {attempt} of {attempts} after {delay:?}");
                tokio::time::sleep(delay).await;
            }

            let request = customize(self.request(method.clone(), url.clone()));
            match self.execute_once(request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::network("Max retries exceeded")))
    }

    async fn execute_once(&self, request: RequestBuilder) -> Result<Option<Value>, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;
        trace!(status = %response.status(), kind = %self.kind, "Kaskada API response");
        Self::read_response(response).await
    }

    async fn read_response(response: Response) -> Result<Option<Value>, ApiError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            if is_not_found(&body) {
                return Ok(None);
            }
            let message = error_message(&body).unwrap_or(body);
            return Err(ApiError::request(status.as_u16(), message));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AuthenticationFailed {
                message: error_message(&body).unwrap_or_else(|| String::from("access denied")),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or(body);
            return Err(ApiError::request(status.as_u16(), message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;
        if body.trim().is_empty() {
            return Ok(Some(Value::Object(serde_json::Map::new())));
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")))
    }

    fn unwrap_envelope(&self, mut body: Value) -> Result<Resource, ApiError> {
        let payload = body
            .get_mut(self.kind.label())
            .map(Value::take)
            .ok_or_else(|| {
                ApiError::invalid_response(format!("missing '{}' in response", self.kind.label()))
            })?;
        Resource::from_value(self.kind, payload)
            .map_err(|e| ApiError::invalid_response(format!("Failed to decode {}: {e}", self.kind.label())))
    }
}

/// Whether a 404 body is the gateway's own `NOT_FOUND` rather than a
/// misrouted request.
fn is_not_found(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("code").and_then(Value::as_u64))
        == Some(GRPC_NOT_FOUND)
}

/// Extracts `message` from a gateway error body (`{"code": 5, "message": "..."}`).
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(ToOwned::to_owned)
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get(&self, name: &str) -> Result<Option<Resource>, ApiError> {
        debug!(kind = %self.kind, name, "Fetching resource");
        let url = self.url(Some(name))?;
        match self.execute(Method::GET, &url, |request| request).await? {
            Some(body) => self.unwrap_envelope(body).map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self, options: &ListOptions) -> Result<ListPage, ApiError> {
        let url = self.url(None)?;
        let mut query = vec![(String::from("pageSize"), options.page_size.to_string())];
        if let Some(search) = options.search.as_deref().filter(|s| !s.is_empty()) {
            query.push((String::from("search"), search.to_owned()));
        }
        if let Some(token) = options.page_token.as_deref().filter(|t| !t.is_empty()) {
            query.push((String::from("pageToken"), token.to_owned()));
        }

        let body = self
            .execute(Method::GET, &url, |request| request.query(&query))
            .await?
            .ok_or_else(|| ApiError::request(404, format!("{} collection not found", self.kind.label())))?;

        let items = match body.get(self.kind.collection()) {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(|item| Resource::from_value(self.kind, item))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApiError::invalid_response(format!("Failed to decode list: {e}")))?,
            _ => Vec::new(),
        };
        let next_page_token = body
            .get("nextPageToken")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(ToOwned::to_owned);

        Ok(ListPage {
            items,
            next_page_token,
        })
    }

    async fn create(&self, resource: &Resource) -> Result<Resource, ApiError> {
        debug!(kind = %self.kind, name = resource.name(), "Creating resource");
        let url = self.url(None)?;
        let payload = resource
            .to_value()
            .map_err(|e| ApiError::invalid_response(format!("Failed to encode resource: {e}")))?;
        let mut envelope = serde_json::Map::new();
        envelope.insert(self.kind.label().to_owned(), payload);
        let envelope = Value::Object(envelope);

        let body = self
            .execute(Method::POST, &url, |request| request.json(&envelope))
            .await?
            .ok_or_else(|| ApiError::request(404, format!("{} collection not found", self.kind.label())))?;
        self.unwrap_envelope(body)
    }

    async fn delete(&self, name: &str) -> Result<(), ApiError> {
        debug!(kind = %self.kind, name, "Deleting resource");
        let url = self.url(Some(name))?;
        match self.execute(Method::DELETE, &url, |request| request).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::request(404, format!("{} '{name}' not found", self.kind.label()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::View;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, kind: ResourceKind) -> HttpResourceClient {
        HttpResourceClient::new(server.uri().parse().unwrap(), 5)
            .unwrap()
            .with_client_id(Some(String::from("sync-test")))
            .for_kind(kind)
    }

    #[tokio::test]
    async fn test_get_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/views/min_max"))
            .and(header("client-id", "sync-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "view": { "viewId": "abc", "viewName": "min_max", "expression": "t.x | max()" }
            })))
            .mount(&server)
            .await;

        let found = client(&server, ResourceKind::View).get("min_max").await.unwrap();
        let Some(Resource::View(view)) = found else {
            panic!("expected a view, got {found:?}");
        };
        assert_eq!(view.view_id.as_deref(), Some("abc"));
        assert_eq!(view.expression, "t.x | max()");
    }

    #[tokio::test]
    async fn test_get_not_found_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/tables/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 5, "message": "table not found"
            })))
            .mount(&server)
            .await;

        let found = client(&server, ResourceKind::Table).get("missing").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/tables/t"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": 16, "message": "bad client id"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, ResourceKind::Table).get("t").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed { ref message } if message == "bad client id"));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/views/v"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/views/v"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "view": { "viewName": "v", "expression": "t" }
            })))
            .mount(&server)
            .await;

        let found = client(&server, ResourceKind::View).get("v").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_list_passes_options() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha/views"))
            .and(query_param("search", "min"))
            .and(query_param("pageSize", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "views": [
                    { "viewName": "min_a", "expression": "t.a" },
                    { "viewName": "min_b", "expression": "t.b" }
                ],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let options = ListOptions {
            search: Some(String::from("min")),
            page_size: 2,
            page_token: None,
        };
        let page = client(&server, ResourceKind::View).list(&options).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_create_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1alpha/views"))
            .and(body_json(serde_json::json!({
                "view": { "viewName": "v", "expression": "t.x" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "view": { "viewId": "id-1", "viewName": "v", "expression": "t.x" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let view = View {
            view_name: String::from("v"),
            expression: String::from("t.x"),
            ..View::default()
        };
        let created = client(&server, ResourceKind::View)
            .create(&view.into())
            .await
            .unwrap();
        assert_eq!(created.name(), "v");
    }

    #[tokio::test]
    async fn test_delete_missing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1alpha/materializations/m"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, ResourceKind::Materialization)
            .delete("m")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_plain_404_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("404 page not found"))
            .mount(&server)
            .await;

        let client = client(&server, ResourceKind::Table);
        let err = client.get("purchases").await.unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 404, ref message } if message == "404 page not found"));

        let err = client.list(&ListOptions::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_create_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1alpha/tables"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let table = crate::resource::Table {
            table_name: String::from("t"),
            ..crate::resource::Table::default()
        };
        let err = client(&server, ResourceKind::Table)
            .create(&table.into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_names_are_path_encoded_under_base_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1alpha/views/a%20b"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 5, "message": "view not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base: Url = format!("{}/api/", server.uri()).parse().unwrap();
        let client = HttpResourceClient::new(base, 5).unwrap().for_kind(ResourceKind::View);
        assert!(client.get("a b").await.unwrap().is_none());
    }
}

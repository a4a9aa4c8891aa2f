//! HTTP client for remote tool backends.
//!
//! Speaks the backend routes served by [`super::server`]:
//!
//! | Call | Route |
//! |------|-------|
//! | discovery | `GET {base}/tools` |
//! | run | `POST {base}/run` |
//! | status | `GET {base}/status/{execution_id}` |
//! | registration | `POST {base}/register` |

use super::http_client;
use async_trait::async_trait;
use relay_application::{
    BackendError, ExecutionLookup, LookupError, RunRequest, RunResponse, ToolBackend,
};
use relay_domain::{BackendEndpoint, ExecutionRecord, ExecutionStatus, ToolDescriptor};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Default request timeout for backend calls.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ToolBackend`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    endpoint: BackendEndpoint,
    client: reqwest::Client,
}

impl HttpBackendClient {
    pub fn new(endpoint: BackendEndpoint) -> Result<Self, reqwest::Error> {
        Self::with_timeout(endpoint, DEFAULT_BACKEND_TIMEOUT)
    }

    pub fn with_timeout(endpoint: BackendEndpoint, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(endpoint, http_client(timeout)?))
    }

    /// Share an existing connection pool
    pub fn with_client(endpoint: BackendEndpoint, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }

    fn unreachable(&self, e: reqwest::Error) -> BackendError {
        BackendError::Unreachable {
            backend: self.endpoint.to_string(),
            message: e.to_string(),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> BackendError {
        BackendError::InvalidResponse {
            backend: self.endpoint.to_string(),
            message: message.into(),
        }
    }

    async fn status_error(&self, response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        BackendError::Status {
            backend: self.endpoint.to_string(),
            status,
            body,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let bytes = response.bytes().await.map_err(|e| self.unreachable(e))?;
        serde_json::from_slice(&bytes).map_err(|e| self.invalid(e.to_string()))
    }
}

/// Listing bodies come either bare or wrapped as `{"tools": [...]}`.
fn listing_entries(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("tools") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// A run body carrying an `execution_id` is an acceptance; anything else is
/// an inline answer.
fn run_response(body: Value) -> RunResponse {
    let execution_id = body
        .get("execution_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    match execution_id {
        Some(execution_id) => {
            let status = body
                .get("status")
                .cloned()
                .and_then(|s| serde_json::from_value(s).ok())
                .unwrap_or(ExecutionStatus::Pending);
            RunResponse::Accepted {
                execution_id,
                status,
            }
        }
        None => RunResponse::Inline(body),
    }
}

/// A 503 run body that is an error receipt, as an acceptance in `error` state.
fn dispatch_failure(body: &[u8]) -> Option<RunResponse> {
    let body: Value = serde_json::from_slice(body).ok()?;
    let execution_id = body.get("execution_id")?.as_str()?.to_string();
    Some(RunResponse::Accepted {
        execution_id,
        status: ExecutionStatus::Error,
    })
}

#[async_trait]
impl ToolBackend for HttpBackendClient {
    fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendError> {
        let url = self.endpoint.join("/tools");
        trace!(%url, "Listing tools");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let body: Value = self.read_json(response).await?;
        let entries = listing_entries(body)
            .ok_or_else(|| self.invalid("tool listing is neither a list nor {\"tools\": [...]}"))?;

        let mut tools = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<ToolDescriptor>(entry) {
                Ok(descriptor) => tools.push(descriptor),
                Err(e) => debug!(backend = %self.endpoint, "Skipping malformed tool entry: {}", e),
            }
        }
        Ok(tools)
    }

    async fn run(&self, request: &RunRequest) -> Result<RunResponse, BackendError> {
        let url = self.endpoint.join("/run");
        debug!(%url, tool = %request.tool_name, "Sending run request");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            // The backend recorded the execution but could not queue it; the
            // receipt still names an id to poll.
            let body = response.bytes().await.map_err(|e| self.unreachable(e))?;
            return dispatch_failure(&body).ok_or_else(|| BackendError::Status {
                backend: self.endpoint.to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let body: Value = self.read_json(response).await?;
        Ok(run_response(body))
    }

    async fn status(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, BackendError> {
        let url = self.endpoint.join(&format!("/status/{}", execution_id));
        trace!(%url, "Polling status");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }
        self.read_json(response).await.map(Some)
    }

    async fn register(&self, descriptor: &ToolDescriptor) -> Result<(), BackendError> {
        let url = self.endpoint.join("/register");
        debug!(%url, tool = %descriptor.name, "Registering tool");
        let response = self
            .client
            .post(&url)
            .json(descriptor)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionLookup for HttpBackendClient {
    async fn lookup(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, LookupError> {
        self.status(execution_id)
            .await
            .map_err(|e| LookupError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HttpBackendClient {
        let endpoint = BackendEndpoint::parse(&server.uri()).unwrap();
        HttpBackendClient::new(endpoint).unwrap()
    }

    fn divide_json() -> Value {
        json!({
            "name": "divide",
            "description": "Divide a by b",
            "queue": "math_queue",
            "args_schema": {
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"]
            }
        })
    }

    #[tokio::test]
    async fn test_list_tools_bare_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([divide_json()])))
            .mount(&server)
            .await;

        let tools = client_for(&server).await.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "divide");
        assert_eq!(tools[0].version, "1.0");
        assert_eq!(tools[0].args_schema.len(), 2);
    }

    #[tokio::test]
    async fn test_list_tools_wrapped_and_skips_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"tools": [divide_json(), {"description": "no name"}]})),
            )
            .mount(&server)
            .await;

        let tools = client_for(&server).await.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[tokio::test]
    async fn test_list_tools_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_tools().await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 500, ref body, .. } if body == "boom"));
    }

    #[tokio::test]
    async fn test_run_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_json(json!({
                "tool_name": "divide",
                "args": {"a": 10, "b": 2},
                "callback_url": "http://127.0.0.1:9000/callback"
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(json!({"execution_id": "abc", "status": "pending"})),
            )
            .mount(&server)
            .await;

        let request = RunRequest::new("divide", json!({"a": 10, "b": 2}))
            .with_callback_url("http://127.0.0.1:9000/callback");
        let response = client_for(&server).await.run(&request).await.unwrap();
        assert_eq!(
            response,
            RunResponse::Accepted {
                execution_id: "abc".to_string(),
                status: ExecutionStatus::Pending,
            }
        );
    }

    #[tokio::test]
    async fn test_run_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 5.0})))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .await
            .run(&RunRequest::new("divide", json!({})))
            .await
            .unwrap();
        assert_eq!(response, RunResponse::Inline(json!({"result": 5.0})));
    }

    #[tokio::test]
    async fn test_run_dispatch_failure_keeps_execution_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "execution_id": "abc",
                "status": "error",
                "error": "failed to queue task: no workers bound to queue 'math_queue'"
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .await
            .run(&RunRequest::new("divide", json!({"a": 1, "b": 2})))
            .await
            .unwrap();
        assert_eq!(
            response,
            RunResponse::Accepted {
                execution_id: "abc".to_string(),
                status: ExecutionStatus::Error,
            }
        );
    }

    #[tokio::test]
    async fn test_run_plain_unavailable_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .run(&RunRequest::new("divide", json!({})))
            .await
            .unwrap_err();
        assert!(
            matches!(err, BackendError::Status { status: 503, ref body, .. } if body == "maintenance")
        );
    }

    #[tokio::test]
    async fn test_run_unknown_tool_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"ok": false})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .run(&RunRequest::new("nope", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_status_found_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "tool": "divide",
                "args": {"a": 10, "b": 2},
                "result": 5.0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let record = client.status("abc").await.unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.result, json!(5.0));

        assert!(client.status("missing").await.unwrap().is_none());
        assert!(client.lookup("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor: ToolDescriptor = serde_json::from_value(divide_json()).unwrap();
        client_for(&server).await.register(&descriptor).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let endpoint = BackendEndpoint::parse("http://127.0.0.1:1").unwrap();
        let client = HttpBackendClient::with_timeout(endpoint, Duration::from_secs(2)).unwrap();
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable { .. }));
    }
}

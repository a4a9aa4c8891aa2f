//! axum HTTP surface.
//!
//! Two routers share one [`HttpServer`] type:
//!
//! - [`backend_router`]: the routes a tool-serving node exposes
//!   (`GET /tools`, `POST /run`, `GET /status/{execution_id}`, `POST /register`)
//! - [`callback_router`]: `POST /callback`, served by callers so workers can
//!   push results into their [`NotificationMediator`](relay_application::NotificationMediator)

use super::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_application::{CallbackIntake, Dispatcher, RunRequest, SubmitRequest, ToolRegistry};
use relay_domain::{CallbackPayload, ExecutionStatus, ToolDescriptor};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared state of the backend routes
#[derive(Clone)]
pub struct BackendState {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<ToolRegistry>,
}

pub fn backend_router(state: BackendState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/run", post(run_tool))
        .route("/status/{execution_id}", get(execution_status))
        .route("/register", post(register_tool))
        .with_state(state)
}

pub fn callback_router(intake: Arc<CallbackIntake>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/callback", post(receive_callback))
        .with_state(intake)
}

async fn health() -> &'static str {
    "ok"
}

/// GET /tools
async fn list_tools(State(state): State<BackendState>) -> Result<Json<Vec<ToolDescriptor>>, ApiError> {
    Ok(Json(state.registry.list().await?))
}

/// POST /run
///
/// 202 with `{execution_id, status}` once the task is queued. A queue
/// failure still yields an execution id, returned with 503.
async fn run_tool(
    State(state): State<BackendState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let mut submit = SubmitRequest::new(request.tool_name, request.args);
    if let Some(url) = request.callback_url {
        submit = submit.with_callback_url(url);
    }

    let receipt = state.dispatcher.submit(submit).await?;
    let status = match receipt.status {
        ExecutionStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::ACCEPTED,
    };
    Ok((status, Json(receipt)).into_response())
}

/// GET /status/{execution_id}
async fn execution_status(
    State(state): State<BackendState>,
    Path(execution_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.dispatcher.status(&execution_id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::not_found(format!(
            "Execution {} not found",
            execution_id
        ))),
    }
}

/// POST /register
async fn register_tool(
    State(state): State<BackendState>,
    body: Result<Json<ToolDescriptor>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(descriptor) = body?;
    let name = descriptor.name.clone();
    state.registry.register(descriptor).await?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "name": name}))).into_response())
}

/// POST /callback
async fn receive_callback(
    State(intake): State<Arc<CallbackIntake>>,
    body: Result<Json<CallbackPayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = body?;
    let execution_id = payload.execution_id.clone();
    if let Err(e) = intake.accept(payload).await {
        warn!(%execution_id, error = %e, "Callback rejected");
        return Err(e.into());
    }
    Ok(Json(json!({"ok": true})))
}

/// A running axum server.
///
/// Stops when [`stop`](Self::stop) is called, when its cancellation token
/// fires, or when it is dropped.
pub struct HttpServer {
    addr: SocketAddr,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Bind `addr` (port 0 picks a free port) and start serving `router`.
    pub async fn start(addr: SocketAddr, router: Router) -> std::io::Result<Self> {
        Self::start_with_cancellation(addr, router, CancellationToken::new()).await
    }

    pub async fn start_with_cancellation(
        addr: SocketAddr,
        router: Router,
        cancellation: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let shutdown = cancellation.clone();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                warn!("HTTP server error: {}", e);
            }
        });
        info!(%addr, "HTTP server listening");

        Ok(Self {
            addr,
            cancellation,
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(mut self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!("HTTP server task failed: {}", e);
        }
        debug!(addr = %self.addr, "HTTP server stopped");
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

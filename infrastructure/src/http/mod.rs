//! HTTP adapters: backend client, callback sender and the axum routes

pub mod callback;
pub mod client;
pub mod error;
pub mod server;

pub use callback::{DEFAULT_CALLBACK_TIMEOUT, HttpCallbackSender};
pub use client::{DEFAULT_BACKEND_TIMEOUT, HttpBackendClient};
pub use error::ApiError;
pub use server::{BackendState, HttpServer, backend_router, callback_router};

use std::time::Duration;

const USER_AGENT: &str = concat!("tool-relay/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

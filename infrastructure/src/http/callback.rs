//! Outbound callback delivery over HTTP

use super::http_client;
use async_trait::async_trait;
use relay_application::{CallbackSender, DeliveryError};
use relay_domain::CallbackPayload;
use std::time::Duration;
use tracing::debug;

/// Default timeout for one callback POST.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the callback payload as JSON to the caller's callback address
#[derive(Debug, Clone)]
pub struct HttpCallbackSender {
    client: reqwest::Client,
}

impl HttpCallbackSender {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_CALLBACK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(%url, execution_id = %payload.execution_id, "Callback delivered");
        Ok(())
    }
}

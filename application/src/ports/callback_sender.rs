//! Callback delivery port
//!
//! Workers push a [`CallbackPayload`] to the caller's callback address after
//! the execution record has been written. Delivery is best effort.

use async_trait::async_trait;
use relay_domain::CallbackPayload;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("callback to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("callback to {url} rejected with HTTP {status}")]
    Rejected { url: String, status: u16 },
}

#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> Result<(), DeliveryError>;
}

/// Sender that drops every callback, for nodes without outbound HTTP
pub struct NoCallbackSender;

#[async_trait]
impl CallbackSender for NoCallbackSender {
    async fn send(&self, _url: &str, _payload: &CallbackPayload) -> Result<(), DeliveryError> {
        Ok(())
    }
}

//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; missing keys fall back to their defaults.

mod client;
mod logging;
mod notification;
mod registry;
mod server;
mod workers;

pub use client::FileClientConfig;
pub use logging::FileLoggingConfig;
pub use notification::FileNotificationConfig;
pub use registry::FileRegistryConfig;
pub use server::FileServerConfig;
pub use workers::FileWorkersConfig;

use relay_domain::BackendEndpoint;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Backend node settings (`serve`)
    pub server: FileServerConfig,
    /// Descriptor discovery
    pub registry: FileRegistryConfig,
    /// Worker slots
    pub workers: FileWorkersConfig,
    /// Client-side settings (`tools`, `call`, `status`, `register`)
    pub client: FileClientConfig,
    /// Callback wait and polling fallback
    pub notification: FileNotificationConfig,
    /// Audit and diagnostic log files
    pub logging: FileLoggingConfig,
}

/// One problem found by [`FileConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted key, e.g. `client.backends`
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut issue = |field: &str, message: String| {
            issues.push(ConfigIssue {
                field: field.to_string(),
                message,
            })
        };

        if let Err(e) = self.server.bind.parse::<SocketAddr>() {
            issue("server.bind", format!("'{}': {}", self.server.bind, e));
        }
        if let Some(url) = &self.server.public_url
            && let Err(e) = BackendEndpoint::parse(url)
        {
            issue("server.public_url", e.to_string());
        }
        if let Some(url) = &self.registry.discovery_url
            && let Err(e) = BackendEndpoint::parse(url)
        {
            issue("registry.discovery_url", e.to_string());
        }
        if self.workers.slots == 0 || self.workers.queues.values().any(|&n| n == 0) {
            issue("workers.slots", "slot counts must be at least 1".to_string());
        }
        if let Err(e) = self.client.endpoints() {
            issue("client.backends", e.to_string());
        }
        if let Err(e) = self.client.callback_bind.parse::<SocketAddr>() {
            issue(
                "client.callback_bind",
                format!("'{}': {}", self.client.callback_bind, e),
            );
        }
        if self.notification.poll_attempts == 0 {
            issue(
                "notification.poll_attempts",
                "must be at least 1".to_string(),
            );
        }

        issues
    }
}

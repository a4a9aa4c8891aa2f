//! Client configuration from TOML (`[client]` section)

use relay_domain::{BackendEndpoint, DomainError};
use serde::{Deserialize, Serialize};

/// Raw client-side configuration used by `tools`, `call`, `status`, `register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClientConfig {
    /// Backend base URLs; duplicates after normalization are ignored
    pub backends: Vec<String>,
    /// Address of the local callback listener (port 0 picks a free port)
    pub callback_bind: String,
    /// Callback URL advertised to backends, when the listener sits behind NAT
    pub callback_url: Option<String>,
    /// Request timeout for backend calls in seconds
    pub request_timeout_secs: u64,
}

impl Default for FileClientConfig {
    fn default() -> Self {
        Self {
            backends: vec!["http://127.0.0.1:8000".to_string()],
            callback_bind: "127.0.0.1:0".to_string(),
            callback_url: None,
            request_timeout_secs: 30,
        }
    }
}

impl FileClientConfig {
    /// Parse `backends` in declaration order, dropping duplicates
    pub fn endpoints(&self) -> Result<Vec<BackendEndpoint>, DomainError> {
        let mut endpoints: Vec<BackendEndpoint> = Vec::new();
        for url in &self.backends {
            let endpoint = BackendEndpoint::parse(url)?;
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }
        Ok(endpoints)
    }
}

//! Server configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};

/// Raw backend-node server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Address the backend routes listen on
    pub bind: String,
    /// Externally reachable base URL, when it differs from `bind`
    pub public_url: Option<String>,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            public_url: None,
        }
    }
}

//! Registry configuration from TOML (`[registry]` section)

use serde::{Deserialize, Serialize};

/// Raw registry configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRegistryConfig {
    /// Backend asked for descriptors missing from the local store
    pub discovery_url: Option<String>,
}

//! Configuration file loading for tool-relay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOL_RELAY_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./relay.toml` or `./.relay.toml`
//! 4. Global: `$XDG_CONFIG_HOME/tool-relay/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileClientConfig, FileConfig, FileLoggingConfig, FileNotificationConfig,
    FileRegistryConfig, FileServerConfig, FileWorkersConfig,
};
pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX};

//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL audit trail of execution events
    pub audit_log: Option<PathBuf>,
    /// Directory for daily-rolling diagnostic log files
    pub log_dir: Option<PathBuf>,
}

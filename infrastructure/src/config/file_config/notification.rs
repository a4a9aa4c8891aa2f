//! Notification configuration from TOML (`[notification]` section)

use relay_application::WaitParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw push/poll wait configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNotificationConfig {
    /// How long to wait for a callback before polling, in seconds
    pub callback_timeout_secs: u64,
    /// Delay between status polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Status polls before giving up
    pub poll_attempts: u32,
    /// Timeout of one outbound callback POST, in seconds
    pub send_timeout_secs: u64,
}

impl Default for FileNotificationConfig {
    fn default() -> Self {
        Self {
            callback_timeout_secs: 30,
            poll_interval_ms: 1000,
            poll_attempts: 30,
            send_timeout_secs: 10,
        }
    }
}

impl FileNotificationConfig {
    pub fn to_wait_params(&self) -> WaitParams {
        WaitParams::default()
            .with_callback_timeout(Duration::from_secs(self.callback_timeout_secs))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_poll_attempts(self.poll_attempts)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_wait_params() {
        assert_eq!(
            FileNotificationConfig::default().to_wait_params(),
            WaitParams::default()
        );
    }

    #[test]
    fn test_partial_section() {
        let toml_str = r#"
[notification]
poll_attempts = 5
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let params = config.notification.to_wait_params();
        assert_eq!(params.poll_attempts, 5);
        assert_eq!(params.callback_timeout, Duration::from_secs(30));
    }
}

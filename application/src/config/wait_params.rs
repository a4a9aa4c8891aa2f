//! Wait parameters: how long a caller blocks for a result.
//!
//! [`WaitParams`] controls the two-stage wait performed by the
//! [`MultiBackendAggregator`](crate::use_cases::aggregator::MultiBackendAggregator):
//! first a push wait on the notification mediator, then bounded polling of
//! the backend's status endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Callback wait + polling fallback parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitParams {
    /// How long to wait for a pushed callback before polling.
    pub callback_timeout: Duration,
    /// Delay between two status polls.
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up.
    pub poll_attempts: u32,
}

impl Default for WaitParams {
    fn default() -> Self {
        Self {
            callback_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            poll_attempts: 30,
        }
    }
}

impl WaitParams {
    // ==================== Builder Methods ====================

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_attempts(mut self, attempts: u32) -> Self {
        self.poll_attempts = attempts;
        self
    }

    /// Worst-case time a caller can be blocked.
    pub fn total_budget(&self) -> Duration {
        self.callback_timeout + self.poll_interval * self.poll_attempts
    }
}

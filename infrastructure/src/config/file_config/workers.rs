//! Worker pool configuration from TOML (`[workers]` section)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkersConfig {
    /// Worker slots per queue
    pub slots: usize,
    /// Per-queue overrides of `slots`
    pub queues: HashMap<String, usize>,
    /// Buffered tasks per queue before submitters wait
    pub queue_capacity: usize,
}

impl Default for FileWorkersConfig {
    fn default() -> Self {
        Self {
            slots: 4,
            queues: HashMap::new(),
            queue_capacity: 1024,
        }
    }
}

impl FileWorkersConfig {
    /// Slot count for `queue`
    pub fn slots_for(&self, queue: &str) -> usize {
        self.queues.get(queue).copied().unwrap_or(self.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_override() {
        let toml_str = r#"
[workers]
slots = 2

[workers.queues]
math_queue = 8
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workers.slots_for("math_queue"), 8);
        assert_eq!(config.workers.slots_for("text_queue"), 2);
        assert_eq!(config.workers.queue_capacity, 1024);
    }
}

//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Soft cap on queued actions; breaching it evicts the oldest `Pending`.
    pub max_pending_actions: usize,
    /// Default retry ceiling; overridable per action at enqueue time.
    pub max_retries: u32,
    /// Fixed delay between retry attempts within a drain.
    pub retry_delay: Duration,
    /// Interval between timer-driven drain attempts.
    pub poll_interval: Duration,
    /// Grace window a delivered action stays visible before pruning.
    pub success_retention: Duration,
    /// Durable key the serialized queue is stored under.
    pub storage_key: String,
    /// Join timeout when stopping the scheduler.
    pub join_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pending_actions: 100,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
            success_retention: Duration::from_secs(3),
            storage_key: "offsync.queue".to_string(),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pending_actions == 0 {
            return Err("Max pending actions must be greater than 0".to_string());
        }

        if self.retry_delay.as_millis() == 0 {
            return Err("Retry delay must be greater than 0".to_string());
        }

        if self.poll_interval.as_millis() == 0 {
            return Err("Poll interval must be greater than 0".to_string());
        }

        if self.storage_key.is_empty() {
            return Err("Storage key must not be empty".to_string());
        }

        Ok(())
    }
}

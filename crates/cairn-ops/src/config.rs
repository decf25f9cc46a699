use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Operation layer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    /// Upper bound on waiting for durable persistence after a mutation.
    pub durability_timeout_ms: u64,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            durability_timeout_ms: 10_000,
        }
    }
}

impl OpsConfig {
    pub fn durability_timeout(&self) -> Duration {
        Duration::from_millis(self.durability_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        assert_eq!(OpsConfig::default().durability_timeout(), Duration::from_secs(10));
    }
}

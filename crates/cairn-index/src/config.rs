use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Index manager settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Upper bound on waiting for an object (or an in-flight indexing task)
    /// before giving up.
    pub availability_timeout_ms: u64,
    /// Register schema objects written outside seeding when they are first
    /// classified.
    pub auto_register_schemas: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            availability_timeout_ms: 5_000,
            auto_register_schemas: true,
        }
    }
}

impl IndexConfig {
    pub fn availability_timeout(&self) -> Duration {
        Duration::from_millis(self.availability_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = IndexConfig::default();
        assert_eq!(c.availability_timeout(), Duration::from_secs(5));
        assert!(c.auto_register_schemas);
    }
}

use serde::{Deserialize, Serialize};

/// Seeding settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Abort on the first failed config or data record instead of
    /// collecting the failure and moving on.
    pub halt_on_record_error: bool,
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use cairn_index::IndexConfig;
use cairn_ops::OpsConfig;
use cairn_seed::SeedConfig;

use crate::error::{SdkError, SdkResult};

/// Settings for one [`Cairn`](crate::Cairn) instance.
///
/// ```toml
/// account = "alice"
///
/// [indexing]
/// availability_timeout_ms = 5000
///
/// [ops]
/// durability_timeout_ms = 10000
///
/// [seed]
/// halt_on_record_error = false
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    /// Name of the principal that owns the registry.
    pub account: String,
    pub indexing: IndexConfig,
    pub ops: OpsConfig,
    pub seed: SeedConfig,
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            account: "default".into(),
            indexing: IndexConfig::default(),
            ops: OpsConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

impl CairnConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        Self::from_toml_str(&read_file(path.as_ref())?)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}

pub(crate) fn read_file(path: &Path) -> SdkResult<String> {
    std::fs::read_to_string(path).map_err(|source| SdkError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn default_config() {
        let c = CairnConfig::default();
        assert_eq!(c.account, "default");
        assert_eq!(c.indexing.availability_timeout(), Duration::from_secs(5));
        assert_eq!(c.ops.durability_timeout(), Duration::from_secs(10));
        assert!(!c.seed.halt_on_record_error);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = CairnConfig::from_toml_str(
            r#"
            account = "alice"

            [seed]
            halt_on_record_error = true
            "#,
        )
        .unwrap();
        assert_eq!(c.account, "alice");
        assert!(c.seed.halt_on_record_error);
        assert_eq!(c.ops, OpsConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ops]\ndurability_timeout_ms = 250").unwrap();
        let c = CairnConfig::load(file.path()).unwrap();
        assert_eq!(c.ops.durability_timeout(), Duration::from_millis(250));

        let rendered = c.to_toml_string().unwrap();
        assert_eq!(CairnConfig::from_toml_str(&rendered).unwrap(), c);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            CairnConfig::from_toml_str("account = 3"),
            Err(SdkError::Config(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CairnConfig::load(dir.path().join("missing.toml")),
            Err(SdkError::Io { .. })
        ));
    }
}

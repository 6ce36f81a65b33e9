//! Engine configuration.
//!
//! Reads the `[engine]` section (and its `[engine.runtime]` sub-table) from
//! `config/default.toml`.  A missing file or section falls back to defaults;
//! a present but malformed file is an error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::RuntimeModel;
use crate::error::{AutomationError, Result};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable overriding [`EngineConfig::operator_address`].
pub const ENV_OPERATOR_ADDRESS: &str = "INBOXPILOT_OPERATOR_ADDRESS";

/// Environment variable overriding the runtime model seed.
pub const ENV_SEED: &str = "INBOXPILOT_SEED";

/// Settings for [`AutomationEngine`](crate::engine::AutomationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where notifications are delivered: the operator's own address, never
    /// the sender's.
    pub operator_address: String,
    /// Points awarded when a trigger category equals a message tag.
    pub category_bonus: u32,
    /// How many recent results the velocity metric averages over.
    pub velocity_window: usize,
    /// Simulated runtime source.
    pub runtime: RuntimeModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operator_address: "whatsapp:operator".into(),
            category_bonus: 1,
            velocity_window: crate::velocity::DEFAULT_WINDOW,
            runtime: RuntimeModel::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    /// Parse the `[engine]` section out of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.engine.validate()?;
        Ok(file.engine)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "engine configuration loaded");
        Ok(config)
    }

    /// Apply `INBOXPILOT_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_OPERATOR_ADDRESS) {
            self.operator_address = address;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            let seed: u64 = seed.trim().parse().map_err(|e| AutomationError::Config {
                reason: format!("{ENV_SEED}=`{seed}` is not a valid seed: {e}"),
            })?;
            self.runtime = self.runtime.with_seed(seed);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.operator_address.trim().is_empty() {
            return Err(AutomationError::Config {
                reason: "operator_address is empty".into(),
            });
        }
        if self.velocity_window == 0 {
            return Err(AutomationError::Config {
                reason: "velocity_window must be at least 1".into(),
            });
        }
        self.runtime.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn parses_engine_section() {
        let toml = r#"
            [engine]
            operator_address = "whatsapp:+15550100"
            category_bonus = 2

            [engine.runtime]
            mode = "fixed"
            secs = 3.0

            [inbox]
            history_limit = 10
        "#;
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.operator_address, "whatsapp:+15550100");
        assert_eq!(config.category_bonus, 2);
        assert_eq!(config.velocity_window, 5);
        assert_eq!(config.runtime, RuntimeModel::Fixed { secs: 3.0 });
    }

    #[test]
    fn rejects_zero_window() {
        let result = EngineConfig::from_toml_str("[engine]\nvelocity_window = 0\n");
        assert!(matches!(result, Err(AutomationError::Config { .. })));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("[engine"),
            Err(AutomationError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\noperator_address = \"ops@example.org\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.operator_address, "ops@example.org");
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_OPERATOR_ADDRESS, "whatsapp:+15550199"),
            (ENV_SEED, "1234"),
        ]);
        let config = EngineConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.operator_address, "whatsapp:+15550199");
        assert!(matches!(config.runtime, RuntimeModel::Seeded { seed: 1234, .. }));
    }

    #[test]
    fn bad_seed_override_rejected() {
        let result = EngineConfig::default().with_overrides(|key| {
            (key == ENV_SEED).then(|| "not-a-number".to_string())
        });
        assert!(matches!(result, Err(AutomationError::Config { .. })));
    }
}

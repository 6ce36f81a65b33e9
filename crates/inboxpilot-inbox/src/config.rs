//! Inbox configuration, read from the `[inbox]` section of
//! `config/default.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InboxError, Result};

/// Settings for [`Inbox`](crate::inbox::Inbox) and
/// [`BatchRunner`](crate::batch::BatchRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Processed results kept in history.
    pub history_limit: usize,
    /// Log entries kept in the activity feed.
    pub activity_limit: usize,
    /// Notifications kept in the notification feed.
    pub notification_limit: usize,
    /// Upper bound on concurrent evaluations in a batch.
    pub max_workers: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            activity_limit: 200,
            notification_limit: 50,
            max_workers: 4,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    inbox: InboxConfig,
}

impl InboxConfig {
    /// Parse the `[inbox]` section out of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.inbox.validate()?;
        Ok(file.inbox)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject zero-sized limits.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("history_limit", self.history_limit),
            ("activity_limit", self.activity_limit),
            ("notification_limit", self.notification_limit),
            ("max_workers", self.max_workers),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((name, _)) => Err(InboxError::Config {
                reason: format!("{name} must be at least 1"),
            }),
            None => Ok(()),
        }
    }
}

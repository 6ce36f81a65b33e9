//! Inbox error types.

use inboxpilot_engine::AutomationError;

/// Unified error type for the inbox stores and batch runner.
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    /// An error propagated from the engine crate.
    #[error("engine error: {0}")]
    Engine(#[from] AutomationError),

    /// A configuration value is out of range.
    #[error("invalid inbox configuration: {reason}")]
    Config { reason: String },

    /// A blocking evaluation task panicked or was cancelled.
    #[error("evaluation task failed: {reason}")]
    TaskFailed { reason: String },

    /// Reading the configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias used throughout the inbox crate.
pub type Result<T> = std::result::Result<T, InboxError>;

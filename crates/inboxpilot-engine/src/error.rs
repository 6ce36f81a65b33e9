//! Automation engine error types.
//!
//! All engine subsystems surface errors through [`AutomationError`].  A
//! message that matches no workflow is *not* an error; it is reported as a
//! [`ProcessedResult`](crate::aggregate::ProcessedResult) with zero
//! confidence.

/// Unified error type for the automation engine.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    // -- Input validation ----------------------------------------------------
    /// The inbound message is missing a required text field.
    #[error("invalid message `{message_id}`: {reason}")]
    InvalidMessage { message_id: String, reason: String },

    /// A workflow definition is malformed.
    #[error("invalid workflow `{workflow_id}`: {reason}")]
    InvalidWorkflow { workflow_id: String, reason: String },

    /// Two workflow definitions share one identifier.
    #[error("duplicate workflow id: {workflow_id}")]
    DuplicateWorkflow { workflow_id: String },

    // -- Registry -----------------------------------------------------------
    /// The referenced workflow is not registered.
    #[error("workflow not found: {workflow_id}")]
    WorkflowNotFound { workflow_id: String },

    // -- Caller contract ----------------------------------------------------
    /// The caller handed the aggregator actions that were not produced for
    /// the given message and matches.
    #[error("contract violation: {reason}")]
    ContractViolation { reason: String },

    // -- Configuration ------------------------------------------------------
    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Reading a configuration or workflow file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal automation error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// Whether this error belongs to the invalid-input class: bad messages,
    /// bad workflow definitions, and aggregator inputs that were not produced
    /// for the message they claim.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidMessage { .. }
                | Self::InvalidWorkflow { .. }
                | Self::DuplicateWorkflow { .. }
                | Self::ContractViolation { .. }
        )
    }
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, AutomationError>;

//! The automation engine: one message in, one result out.
//!
//! An evaluation walks a fixed pipeline with no backward transitions:
//!
//! ```text
//! Queued  -->  Matched  -->  Executed  -->  Notified  -->  Aggregated
//! ```
//!
//! The engine holds only immutable configuration and an injected clock.  It
//! keeps no state between evaluations, so one instance can be shared across
//! threads and evaluate many messages in parallel.  Queues, history and
//! delivery belong to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{ProcessedResult, aggregate};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::{ActionExecutor, LogEntry};
use crate::matcher::{TriggerMatcher, WorkflowMatch};
use crate::message::Message;
use crate::notify::{Notification, synthesize};
use crate::registry::RegistrySnapshot;
use crate::velocity::velocity;
use crate::workflow::WorkflowDefinition;

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub result: ProcessedResult,
    /// One entry per executed action, in generation order.
    pub log: Vec<LogEntry>,
    pub notifications: Vec<Notification>,
}

/// Stateless message-to-workflow automation engine.
///
/// Cheap to clone; all clones share the same configuration and clock.
#[derive(Clone)]
pub struct AutomationEngine {
    config: Arc<EngineConfig>,
    matcher: TriggerMatcher,
    clock: Arc<dyn Clock>,
}

impl AutomationEngine {
    /// Create an engine using the system clock.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            matcher: TriggerMatcher::new(config.category_bonus),
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock (tests pin or step time with this).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the matcher stage on its own.
    pub fn match_message(&self, message: &Message, snapshot: &RegistrySnapshot) -> Vec<WorkflowMatch> {
        self.matcher.match_message(message, snapshot)
    }

    /// Evaluate one message against a registry snapshot.
    ///
    /// An invalid message is rejected before matching starts.  A message that
    /// matches nothing yields a zero-confidence result, not an error.
    pub fn evaluate(&self, message: impl Into<Arc<Message>>, snapshot: &RegistrySnapshot) -> Result<Evaluation> {
        let message: Arc<Message> = message.into();
        if let Err(e) = message.validate() {
            warn!(message_id = %message.id, error = %e, "message rejected");
            return Err(e);
        }

        let matches = self.matcher.match_message(&message, snapshot);

        let execution =
            ActionExecutor::new(self.clock.as_ref(), &self.config.runtime)?.execute(&message, snapshot, &matches)?;

        // Read after execution so no log entry postdates the result.
        let evaluated_at = self.clock.now();

        let notifications = synthesize(
            &message,
            &execution.actions,
            &self.config.operator_address,
            evaluated_at,
        );

        let result = aggregate(Arc::clone(&message), matches, execution.actions, evaluated_at)?;

        info!(
            message_id = %message.id,
            matched = result.matched_workflow_ids.len(),
            actions = result.executed_actions.len(),
            notifications = notifications.len(),
            confidence = result.confidence,
            "message evaluated"
        );

        Ok(Evaluation {
            result,
            log: execution.log,
            notifications,
        })
    }

    /// Validate `definitions` into a snapshot, then evaluate.
    pub fn evaluate_definitions(
        &self,
        message: impl Into<Arc<Message>>,
        definitions: &[WorkflowDefinition],
    ) -> Result<Evaluation> {
        let snapshot = RegistrySnapshot::new(definitions.to_vec())?;
        self.evaluate(message, &snapshot)
    }

    /// Velocity over `recent` (most recent first) using the configured
    /// window.
    pub fn velocity<'a, I>(&self, recent: I) -> f64
    where
        I: IntoIterator<Item = &'a ProcessedResult>,
    {
        velocity(recent, self.config.velocity_window)
    }
}

impl std::fmt::Debug for AutomationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationEngine")
            .field("config", &self.config)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::{FixedClock, RuntimeModel, SteppingClock};
    use crate::error::AutomationError;
    use crate::workflow::{ActionKind, ActionSpec, Trigger};

    fn engine() -> AutomationEngine {
        let config = EngineConfig {
            runtime: RuntimeModel::Fixed { secs: 2.0 },
            ..EngineConfig::default()
        };
        AutomationEngine::new(config)
            .unwrap()
            .with_clock(Arc::new(FixedClock(Utc::now())))
    }

    fn definitions() -> Vec<WorkflowDefinition> {
        vec![
            WorkflowDefinition::new("invoices", "Invoice triage", Trigger::keywords(["invoice"]))
                .with_action(ActionSpec::new(ActionKind::UpdateTracker, "Log invoice", "Add to ledger"))
                .with_action(ActionSpec::new(ActionKind::NotifyWhatsapp, "Ping operator", "Invoice logged")),
        ]
    }

    #[test]
    fn evaluates_matching_message() {
        let msg = Message::new("m-1", "Invoice 42", "billing@vendor.com", Utc::now());
        let eval = engine().evaluate_definitions(msg, &definitions()).unwrap();

        assert_eq!(eval.result.matched_workflow_ids, vec!["invoices"]);
        assert_eq!(eval.result.executed_actions.len(), 2);
        assert_eq!(eval.log.len(), 2);
        assert_eq!(eval.notifications.len(), 1);
        assert_eq!(eval.notifications[0].to, "whatsapp:operator");
        assert_eq!(eval.result.confidence, 1.0);
    }

    #[test]
    fn invalid_message_rejected_before_matching() {
        let msg = Message::new("m-1", "", "billing@vendor.com", Utc::now());
        let err = engine().evaluate_definitions(msg, &definitions()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn invalid_workflow_rejected() {
        let mut defs = definitions();
        defs.push(WorkflowDefinition::new("", "Broken", Trigger::default()));
        let msg = Message::new("m-1", "Invoice 42", "billing@vendor.com", Utc::now());
        let err = engine().evaluate_definitions(msg, &defs).unwrap_err();
        assert!(matches!(err, AutomationError::InvalidWorkflow { .. }));
    }

    #[test]
    fn result_time_follows_every_log_entry() {
        let start = Utc::now();
        let engine = AutomationEngine::new(EngineConfig::default())
            .unwrap()
            .with_clock(Arc::new(SteppingClock::new(start, chrono::Duration::seconds(1))));
        let msg = Message::new("m-1", "Invoice 42", "billing@vendor.com", start);
        let eval = engine.evaluate_definitions(msg, &definitions()).unwrap();

        let last_log = eval.log.iter().map(|e| e.timestamp).max().unwrap();
        assert!(eval.result.processed_at > last_log);
        assert!(eval.notifications.iter().all(|n| n.timestamp == eval.result.processed_at));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            operator_address: String::new(),
            ..EngineConfig::default()
        };
        assert!(AutomationEngine::new(config).is_err());
    }

    #[test]
    fn engine_velocity_uses_configured_window() {
        let engine = engine();
        let snapshot = RegistrySnapshot::new(definitions()).unwrap();
        let eval = engine
            .evaluate(Message::new("m-1", "Invoice", "a@b.c", Utc::now()), &snapshot)
            .unwrap();
        assert_eq!(engine.velocity([&eval.result]), 30.0);
    }
}

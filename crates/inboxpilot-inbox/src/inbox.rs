//! Caller-owned inbox stores.
//!
//! The engine keeps no state, so everything that outlives one evaluation
//! lives here: the pending queue, processed history, the activity log feed
//! and the notification feed.  Feeds surface newest first.
//!
//! # Queue policy
//!
//! A message leaves the pending queue once evaluated, whether or not any
//! workflow matched.  Messages the engine rejects as invalid input move to
//! [`Inbox::rejected`].  Any other engine error puts the message back at the
//! head of the queue and is returned to the caller; nothing is retried
//! automatically.

use std::collections::VecDeque;
use std::sync::Arc;

use inboxpilot_engine::{
    AutomationEngine, AutomationError, Evaluation, LogEntry, Message, Notification, ProcessedResult,
    RegistrySnapshot, WorkflowRegistry,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::InboxConfig;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A message the engine refused to evaluate.
#[derive(Debug, Clone, Serialize)]
pub struct Rejected {
    pub message: Arc<Message>,
    pub reason: String,
}

/// What happened to one dequeued message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ProcessOutcome {
    /// Evaluated; `matched == 0` means no automation applied.
    Processed {
        message_id: String,
        matched: usize,
        actions: usize,
        notifications: usize,
        confidence: f64,
        summary: String,
    },
    /// Refused as invalid input.
    Rejected { message_id: String, reason: String },
}

impl ProcessOutcome {
    /// The id of the message this outcome is about.
    pub fn message_id(&self) -> &str {
        match self {
            Self::Processed { message_id, .. } | Self::Rejected { message_id, .. } => message_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// Pending queue plus history and feeds for one operator.
#[derive(Debug, Default)]
pub struct Inbox {
    config: InboxConfig,
    pending: VecDeque<Arc<Message>>,
    history: VecDeque<ProcessedResult>,
    activity: VecDeque<LogEntry>,
    notifications: VecDeque<Notification>,
    rejected: Vec<Rejected>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new(config: InboxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Append a message to the pending queue.
    pub fn enqueue(&mut self, message: impl Into<Arc<Message>>) {
        let message = message.into();
        debug!(message_id = %message.id, "message queued");
        self.pending.push_back(message);
    }

    /// Messages waiting for evaluation, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.pending.iter().map(AsRef::as_ref)
    }

    /// Number of pending messages.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Processed results, newest first.
    pub fn history(&self) -> impl Iterator<Item = &ProcessedResult> {
        self.history.iter()
    }

    /// Activity log, newest first.
    pub fn activity(&self) -> impl Iterator<Item = &LogEntry> {
        self.activity.iter()
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// Messages the engine rejected, in rejection order.
    pub fn rejected(&self) -> &[Rejected] {
        &self.rejected
    }

    /// Throughput over recent history.
    pub fn velocity(&self, engine: &AutomationEngine) -> f64 {
        engine.velocity(self.history.iter())
    }

    /// Evaluate the oldest pending message.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    pub fn process_next(
        &mut self,
        engine: &AutomationEngine,
        snapshot: &RegistrySnapshot,
    ) -> Result<Option<ProcessOutcome>> {
        let Some(message) = self.pending.pop_front() else {
            return Ok(None);
        };

        match engine.evaluate(Arc::clone(&message), snapshot) {
            Ok(evaluation) => Ok(Some(self.record(evaluation))),
            Err(e) if e.is_invalid_input() => Ok(Some(self.reject(message, &e))),
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "evaluation failed, message left pending");
                self.pending.push_front(message);
                Err(e.into())
            }
        }
    }

    /// Drain the pending queue.
    ///
    /// A fresh registry snapshot is taken for every message, so authoring
    /// changes land between messages but never during one.
    pub fn process_all(
        &mut self,
        engine: &AutomationEngine,
        registry: &WorkflowRegistry,
    ) -> Result<Vec<ProcessOutcome>> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while !self.pending.is_empty() {
            let snapshot = registry.snapshot()?;
            if let Some(outcome) = self.process_next(engine, &snapshot)? {
                outcomes.push(outcome);
            }
        }
        info!(processed = outcomes.len(), "pending queue drained");
        Ok(outcomes)
    }

    /// Store an evaluation produced elsewhere (e.g. by a batch run).
    pub fn record(&mut self, evaluation: Evaluation) -> ProcessOutcome {
        let Evaluation {
            result,
            log,
            notifications,
        } = evaluation;

        let outcome = ProcessOutcome::Processed {
            message_id: result.message.id.clone(),
            matched: result.matched_workflow_ids.len(),
            actions: result.executed_actions.len(),
            notifications: notifications.len(),
            confidence: result.confidence,
            summary: result.summary.clone(),
        };

        for entry in log {
            push_newest(&mut self.activity, entry, self.config.activity_limit);
        }
        for notification in notifications {
            push_newest(&mut self.notifications, notification, self.config.notification_limit);
        }
        push_newest(&mut self.history, result, self.config.history_limit);

        outcome
    }

    /// Store an invalid-input rejection produced elsewhere.
    pub fn reject(&mut self, message: Arc<Message>, error: &AutomationError) -> ProcessOutcome {
        warn!(message_id = %message.id, error = %error, "message rejected");
        let outcome = ProcessOutcome::Rejected {
            message_id: message.id.clone(),
            reason: error.to_string(),
        };
        self.rejected.push(Rejected {
            message,
            reason: error.to_string(),
        });
        outcome
    }

    pub(crate) fn drain_pending(&mut self) -> Vec<Arc<Message>> {
        self.pending.drain(..).collect()
    }

    /// Put `messages` back at the head of the queue, keeping their order.
    pub(crate) fn requeue_front(&mut self, messages: Vec<Arc<Message>>) {
        for message in messages.into_iter().rev() {
            self.pending.push_front(message);
        }
    }
}

fn push_newest<T>(feed: &mut VecDeque<T>, item: T, limit: usize) {
    feed.push_front(item);
    feed.truncate(limit);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

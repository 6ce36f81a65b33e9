//! Concurrent batch evaluation.
//!
//! Evaluation is synchronous and CPU-bound, so each message runs on the
//! blocking pool via [`tokio::task::spawn_blocking`].  A semaphore caps how
//! many run at once.  Every task shares one registry snapshot, and results
//! come back in submission order regardless of completion order.

use std::sync::Arc;

use inboxpilot_engine::{AutomationEngine, AutomationError, Evaluation, Message, RegistrySnapshot};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{InboxError, Result};
use crate::inbox::{Inbox, ProcessOutcome};

/// The outcome of one message in a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub message: Arc<Message>,
    pub outcome: std::result::Result<Evaluation, AutomationError>,
}

/// Evaluates many messages concurrently with bounded parallelism.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    max_workers: usize,
}

impl BatchRunner {
    /// Create a runner allowing up to `max_workers` concurrent evaluations.
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(InboxError::Config {
                reason: "max_workers must be at least 1".into(),
            });
        }
        Ok(Self { max_workers })
    }

    /// The concurrency limit.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Evaluate every message against `snapshot`.
    ///
    /// Per-message engine errors are reported in the returned items.  Only a
    /// panicked or cancelled task fails the whole batch.
    pub async fn run(
        &self,
        engine: &AutomationEngine,
        snapshot: &RegistrySnapshot,
        messages: Vec<Arc<Message>>,
    ) -> Result<Vec<BatchItem>> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let total = messages.len();

        let mut handles: Vec<(Arc<Message>, JoinHandle<_>)> = Vec::with_capacity(total);
        for message in messages {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| InboxError::TaskFailed {
                    reason: format!("semaphore closed: {e}"),
                })?;
            let engine = engine.clone();
            let snapshot = snapshot.clone();
            let task_message = Arc::clone(&message);

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.evaluate(task_message, &snapshot)
            });
            handles.push((message, handle));
        }

        let mut items = Vec::with_capacity(total);
        for (message, handle) in handles {
            let outcome = handle.await.map_err(|e| InboxError::TaskFailed {
                reason: format!("evaluation of `{}` did not complete: {e}", message.id),
            })?;
            if let Err(e) = &outcome {
                debug!(message_id = %message.id, error = %e, "batch item failed");
            }
            items.push(BatchItem { message, outcome });
        }

        info!(
            total,
            failed = items.iter().filter(|item| item.outcome.is_err()).count(),
            workers = self.max_workers,
            "batch finished"
        );
        Ok(items)
    }
}

impl Inbox {
    /// Drain the pending queue through `runner`, recording every result.
    ///
    /// Follows the same queue policy as [`Inbox::process_next`]: invalid
    /// messages are rejected, and any other failure puts that message and
    /// every later one back in the queue before the error is returned.
    pub async fn process_batch(
        &mut self,
        runner: &BatchRunner,
        engine: &AutomationEngine,
        snapshot: &RegistrySnapshot,
    ) -> Result<Vec<ProcessOutcome>> {
        let messages: Vec<_> = self.drain_pending();
        let items = runner.run(engine, snapshot, messages.clone()).await;
        let items = match items {
            Ok(items) => items,
            Err(e) => {
                self.requeue_front(messages);
                return Err(e);
            }
        };
        self.absorb(items)
    }

    /// Record batch items in order.
    ///
    /// Stops at the first non-input engine error: that message and the rest
    /// return to the head of the pending queue.
    pub fn absorb(&mut self, items: Vec<BatchItem>) -> Result<Vec<ProcessOutcome>> {
        let mut outcomes = Vec::with_capacity(items.len());
        let mut items = items.into_iter();
        while let Some(BatchItem { message, outcome }) = items.next() {
            match outcome {
                Ok(evaluation) => outcomes.push(self.record(evaluation)),
                Err(e) if e.is_invalid_input() => outcomes.push(self.reject(message, &e)),
                Err(e) => {
                    let rest = std::iter::once(message)
                        .chain(items.map(|item| item.message))
                        .collect();
                    self.requeue_front(rest);
                    return Err(e.into());
                }
            }
        }
        Ok(outcomes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use inboxpilot_engine::{ActionKind, ActionSpec, EngineConfig, Trigger, WorkflowDefinition};

    use super::*;
    use crate::config::InboxConfig;

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::new(vec![
            WorkflowDefinition::new("invoices", "Invoice triage", Trigger::keywords(["invoice"]))
                .with_action(ActionSpec::new(ActionKind::UpdateTracker, "Log", "Ledger")),
        ])
        .unwrap()
    }

    fn msg(id: &str, subject: &str) -> Arc<Message> {
        Arc::new(Message::new(id, subject, "a@b.c", Utc::now()))
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(BatchRunner::new(0).is_err());
    }

    #[tokio::test]
    async fn results_keep_submission_order() {
        let engine = AutomationEngine::new(EngineConfig::default()).unwrap();
        let messages: Vec<_> = (0..20)
            .map(|i| msg(&format!("m-{i}"), if i % 3 == 0 { "Invoice" } else { "Hello" }))
            .collect();

        let items = BatchRunner::new(3)
            .unwrap()
            .run(&engine, &snapshot(), messages)
            .await
            .unwrap();

        assert_eq!(items.len(), 20);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.message.id, format!("m-{i}"));
            let eval = item.outcome.as_ref().unwrap();
            assert_eq!(eval.result.message.id, item.message.id);
            assert_eq!(eval.result.is_matched(), i % 3 == 0);
        }
    }

    #[tokio::test]
    async fn invalid_items_are_reported_not_fatal() {
        let engine = AutomationEngine::new(EngineConfig::default()).unwrap();
        let items = BatchRunner::new(2)
            .unwrap()
            .run(&engine, &snapshot(), vec![msg("m-1", ""), msg("m-2", "Invoice")])
            .await
            .unwrap();

        assert!(items[0].outcome.as_ref().unwrap_err().is_invalid_input());
        assert!(items[1].outcome.is_ok());
    }

    #[tokio::test]
    async fn inbox_batch_drains_queue() {
        let engine = AutomationEngine::new(EngineConfig::default()).unwrap();
        let mut inbox = Inbox::new(InboxConfig::default()).unwrap();
        inbox.enqueue(msg("m-1", "Invoice"));
        inbox.enqueue(msg("m-2", ""));
        inbox.enqueue(msg("m-3", "Hello"));

        let outcomes = inbox
            .process_batch(&BatchRunner::new(2).unwrap(), &engine, &snapshot())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(inbox.pending_len(), 0);
        assert_eq!(inbox.history().count(), 2);
        assert_eq!(inbox.rejected().len(), 1);
    }

    #[test]
    fn absorb_requeues_on_internal_error() {
        let mut inbox = Inbox::new(InboxConfig::default()).unwrap();
        let items = vec![
            BatchItem {
                message: msg("m-1", "x"),
                outcome: Err(AutomationError::Internal("boom".into())),
            },
            BatchItem {
                message: msg("m-2", "y"),
                outcome: Err(AutomationError::Internal("unreached".into())),
            },
        ];

        assert!(inbox.absorb(items).is_err());
        let pending: Vec<_> = inbox.pending().map(|m| m.id.as_str()).collect();
        assert_eq!(pending, vec!["m-1", "m-2"]);
    }
}

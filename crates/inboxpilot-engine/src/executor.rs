//! Action executor: realize matched workflows as executed actions.
//!
//! For each match, in matcher order, every [`ActionSpec`] of the workflow is
//! realized in definition order as an [`ExecutedAction`] and immediately
//! followed by one [`LogEntry`].  Execution is simulated: runtimes come from
//! the injected [`RuntimeModel`] and timestamps from the injected [`Clock`].
//!
//! This is the only component that produces log entries.  No action type can
//! abort a run; unrecognized types were already folded into
//! [`ActionKind::Custom`] when the definition was read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, RuntimeModel};
use crate::error::{AutomationError, Result};
use crate::matcher::WorkflowMatch;
use crate::message::Message;
use crate::registry::{CompiledWorkflow, RegistrySnapshot};
use crate::workflow::{ActionKind, ActionSpec};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A realized instance of an [`ActionSpec`] for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    /// Fresh identifier for this run.
    pub id: Uuid,
    /// The message this action was produced for.
    pub message_id: String,
    /// The workflow the action belongs to.
    pub workflow_id: String,
    /// Action type.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Copied from the [`ActionSpec`].
    pub summary: String,
    /// Copied from the [`ActionSpec`] verbatim.
    pub detail: String,
    /// Simulated runtime in seconds (> 0).  Used only for throughput.
    pub runtime_secs: f64,
}

/// One audit record per executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub workflow_id: String,
    pub action_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Everything one execution pass produced, in generation order.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub actions: Vec<ExecutedAction>,
    pub log: Vec<LogEntry>,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Simulated action executor.
pub struct ActionExecutor<'a> {
    clock: &'a dyn Clock,
    runtime: &'a RuntimeModel,
}

impl<'a> ActionExecutor<'a> {
    /// Create an executor over the given simulation sources.
    ///
    /// Fails with [`AutomationError::Config`] if `runtime` could yield a
    /// non-positive runtime.
    pub fn new(clock: &'a dyn Clock, runtime: &'a RuntimeModel) -> Result<Self> {
        runtime.validate()?;
        Ok(Self { clock, runtime })
    }

    /// Execute every matched workflow.
    ///
    /// All matches are resolved against `snapshot` before anything runs, so a
    /// match naming an unknown workflow aborts the call with no output.
    pub fn execute(
        &self,
        message: &Message,
        snapshot: &RegistrySnapshot,
        matches: &[WorkflowMatch],
    ) -> Result<Execution> {
        let workflows = matches
            .iter()
            .map(|m| {
                snapshot
                    .compiled(&m.workflow_id)
                    .ok_or_else(|| {
                        AutomationError::Internal(format!(
                            "matched workflow `{}` is not in the registry snapshot",
                            m.workflow_id
                        ))
                    })
            })
            .collect::<Result<Vec<&CompiledWorkflow>>>()?;

        let capacity = workflows.iter().map(|w| w.definition().actions.len()).sum();
        let mut execution = Execution {
            actions: Vec::with_capacity(capacity),
            log: Vec::with_capacity(capacity),
        };
        let mut sampler = self.runtime.sampler(&message.id);

        for workflow in workflows {
            let definition = workflow.definition();
            if definition.actions.is_empty() {
                warn!(workflow_id = %definition.id, "matched workflow has no actions");
                continue;
            }

            for spec in &definition.actions {
                let action = realize(message, &definition.id, spec, sampler.next_secs());
                let entry = LogEntry {
                    id: Uuid::now_v7(),
                    workflow_id: definition.id.clone(),
                    action_id: action.id,
                    timestamp: self.clock.now(),
                    title: format!("{}: {}", definition.name, action.summary),
                    body: action.detail.clone(),
                };

                debug!(
                    message_id = %message.id,
                    workflow_id = %definition.id,
                    action = %action.kind,
                    runtime_secs = action.runtime_secs,
                    "action executed"
                );

                execution.actions.push(action);
                execution.log.push(entry);
            }
        }

        Ok(execution)
    }
}

fn realize(message: &Message, workflow_id: &str, spec: &ActionSpec, runtime_secs: f64) -> ExecutedAction {
    ExecutedAction {
        id: Uuid::now_v7(),
        message_id: message.id.clone(),
        workflow_id: workflow_id.to_string(),
        kind: spec.kind,
        summary: spec.summary.clone(),
        detail: spec.detail.clone(),
        runtime_secs,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Result aggregator.
//!
//! Folds matches and executed actions into the single [`ProcessedResult`]
//! an evaluation returns.  Confidence is the top match's score normalized by
//! the most that workflow could have scored; it is 0 exactly when nothing
//! matched.  Whether a zero-confidence message counts as processed is the
//! caller's decision.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, Result};
use crate::executor::ExecutedAction;
use crate::matcher::WorkflowMatch;
use crate::message::Message;

/// Summary used when no workflow matched.
pub const NO_MATCH_SUMMARY: &str = "No automation applicable";

/// The terminal output of one evaluation.  Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// The evaluated message, shared with the caller.
    pub message: Arc<Message>,
    /// Strength of the best match, in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable, deterministic summary.
    pub summary: String,
    /// Matched workflow ids, best first.
    pub matched_workflow_ids: Vec<String>,
    /// Full match details, same order as `matched_workflow_ids`.
    pub matches: Vec<WorkflowMatch>,
    /// Every executed action, in execution order.
    pub executed_actions: Vec<ExecutedAction>,
    /// Whether any matched workflow lacks autopilot and wants a human to
    /// confirm.
    pub requires_confirmation: bool,
    /// Received time plus the tightest SLA among the matches, if any.
    pub sla_deadline: Option<DateTime<Utc>>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedResult {
    /// Whether at least one workflow matched.
    pub fn is_matched(&self) -> bool {
        !self.matched_workflow_ids.is_empty()
    }

    /// Sum of simulated runtimes.
    pub fn total_runtime_secs(&self) -> f64 {
        self.executed_actions.iter().map(|a| a.runtime_secs).sum()
    }
}

/// Combine matches and actions into a [`ProcessedResult`].
///
/// Fails with [`AutomationError::ContractViolation`] if `actions` is not a
/// list the executor produced for `message` and `matches`.
pub fn aggregate(
    message: Arc<Message>,
    matches: Vec<WorkflowMatch>,
    actions: Vec<ExecutedAction>,
    processed_at: DateTime<Utc>,
) -> Result<ProcessedResult> {
    check_provenance(&message, &matches, &actions)?;

    let confidence = matches.first().map(WorkflowMatch::strength).unwrap_or(0.0);
    let summary = summarize(&matches, actions.len());
    let requires_confirmation = matches.iter().any(|m| !m.autopilot);
    let sla_deadline = matches
        .iter()
        .filter(|m| m.sla_minutes > 0)
        .map(|m| m.sla_minutes)
        .min()
        .map(|minutes| message.received_at + Duration::minutes(i64::from(minutes)));

    Ok(ProcessedResult {
        confidence,
        summary,
        matched_workflow_ids: matches.iter().map(|m| m.workflow_id.clone()).collect(),
        matches,
        executed_actions: actions,
        requires_confirmation,
        sla_deadline,
        processed_at,
        message,
    })
}

/// Deterministic summary for `matches` and `action_count` actions.
pub fn summarize(matches: &[WorkflowMatch], action_count: usize) -> String {
    if matches.is_empty() {
        return NO_MATCH_SUMMARY.to_string();
    }
    let names: Vec<&str> = matches.iter().map(|m| m.workflow_name.as_str()).collect();
    format!(
        "Executed {} {} across {} {}: {}",
        action_count,
        plural(action_count, "action", "actions"),
        matches.len(),
        plural(matches.len(), "workflow", "workflows"),
        names.join(", ")
    )
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Reject an action list the executor could not have produced for
/// `message` and `matches`: foreign message ids, unmatched workflows,
/// repeated action ids, or workflows out of match order.
fn check_provenance(message: &Message, matches: &[WorkflowMatch], actions: &[ExecutedAction]) -> Result<()> {
    let violation = |reason: String| AutomationError::ContractViolation { reason };

    let mut seen = HashSet::with_capacity(actions.len());
    let mut last_position = 0;

    for action in actions {
        if action.message_id != message.id {
            return Err(violation(format!(
                "action {} was produced for message `{}`, not `{}`",
                action.id, action.message_id, message.id
            )));
        }
        let Some(position) = matches.iter().position(|m| m.workflow_id == action.workflow_id) else {
            return Err(violation(format!(
                "action {} belongs to workflow `{}`, which did not match",
                action.id, action.workflow_id
            )));
        };
        if !seen.insert(action.id) {
            return Err(violation(format!("action {} appears more than once", action.id)));
        }
        if position < last_position {
            return Err(violation(format!(
                "action {} of workflow `{}` is out of match order",
                action.id, action.workflow_id
            )));
        }
        last_position = position;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

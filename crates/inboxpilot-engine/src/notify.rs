//! Notification synthesizer.
//!
//! Every executed `notify_whatsapp` action yields exactly one outbound
//! [`Notification`] addressed to the operator.  No other action type ever
//! produces one.  Delivery is the caller's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::ExecutedAction;
use crate::message::Message;

/// An outbound confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Destination address (the operator's, from configuration).
    pub to: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Originating workflow.
    pub workflow_id: String,
    /// Originating action.
    pub action_id: Uuid,
}

/// Render the notification body for `action` on `message`.
pub fn render_body(message: &Message, action: &ExecutedAction) -> String {
    format!("[{}] {}: {}", message.subject, action.summary, action.detail)
}

/// Build one notification per notification-class action.
pub fn synthesize(
    message: &Message,
    actions: &[ExecutedAction],
    operator_address: &str,
    evaluated_at: DateTime<Utc>,
) -> Vec<Notification> {
    actions
        .iter()
        .filter(|action| action.kind.is_notification())
        .map(|action| {
            tracing::debug!(
                message_id = %message.id,
                workflow_id = %action.workflow_id,
                to = %operator_address,
                "notification synthesized"
            );
            Notification {
                id: Uuid::now_v7(),
                to: operator_address.to_string(),
                body: render_body(message, action),
                timestamp: evaluated_at,
                workflow_id: action.workflow_id.clone(),
                action_id: action.id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ActionKind;

    fn action(kind: ActionKind, workflow_id: &str, summary: &str, detail: &str) -> ExecutedAction {
        ExecutedAction {
            id: Uuid::now_v7(),
            message_id: "m-1".into(),
            workflow_id: workflow_id.into(),
            kind,
            summary: summary.into(),
            detail: detail.into(),
            runtime_secs: 1.0,
        }
    }

    fn message() -> Message {
        Message::new("m-1", "Finalist questionnaire", "grants@example.org", Utc::now())
    }

    #[test]
    fn only_whatsapp_actions_notify() {
        let actions = vec![
            action(ActionKind::Analysis, "a", "Read", "..."),
            action(ActionKind::NotifyWhatsapp, "b", "Ping me", "Submitted"),
            action(ActionKind::Custom, "a", "Other", "..."),
        ];
        let now = Utc::now();
        let notes = synthesize(&message(), &actions, "whatsapp:+15550100", now);

        assert_eq!(notes.len(), 1);
        let note = &notes[0];
        assert_eq!(note.to, "whatsapp:+15550100");
        assert_eq!(note.workflow_id, "b");
        assert_eq!(note.action_id, actions[1].id);
        assert_eq!(note.timestamp, now);
        assert_eq!(note.body, "[Finalist questionnaire] Ping me: Submitted");
    }

    #[test]
    fn destination_is_never_the_sender() {
        let actions = vec![action(ActionKind::NotifyWhatsapp, "b", "Ping", "x")];
        let notes = synthesize(&message(), &actions, "ops", Utc::now());
        assert_ne!(notes[0].to, message().from_address);
    }

    #[test]
    fn no_actions_no_notifications() {
        assert!(synthesize(&message(), &[], "ops", Utc::now()).is_empty());
    }
}

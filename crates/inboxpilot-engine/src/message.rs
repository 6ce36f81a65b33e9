//! Inbound messages.
//!
//! A [`Message`] is an email-like unit of work handed to the engine by the
//! caller.  The engine never mutates it; evaluations share it through an
//! [`Arc`](std::sync::Arc).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, Result};

/// An inbound email-like message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Caller-assigned unique identifier.
    pub id: String,
    /// Subject line.
    pub subject: String,
    /// Sender address (e.g. `grants@foundation.org`).
    pub from_address: String,
    /// Sender display name.
    #[serde(default)]
    pub from_name: String,
    /// Recipient address.
    #[serde(default)]
    pub to_address: String,
    /// Short preview text shown in list views.
    #[serde(default)]
    pub preview: String,
    /// Full body text.
    #[serde(default)]
    pub body: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Free-text tags attached by the caller.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Message {
    /// Create a message with the required fields; everything else is empty.
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        from_address: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            from_address: from_address.into(),
            from_name: String::new(),
            to_address: String::new(),
            preview: String::new(),
            body: String::new(),
            received_at,
            tags: Vec::new(),
        }
    }

    /// Set the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the sender display name.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = name.into();
        self
    }

    /// Set the recipient address.
    pub fn with_recipient(mut self, address: impl Into<String>) -> Self {
        self.to_address = address.into();
        self
    }

    /// Set the preview text.
    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    /// Replace the tag set.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check the required text fields.
    ///
    /// Identifier, subject and sender address must be non-blank.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.id.trim().is_empty() {
            Some("id is empty")
        } else if self.subject.trim().is_empty() {
            Some("subject is empty")
        } else if self.from_address.trim().is_empty() {
            Some("sender address is empty")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(AutomationError::InvalidMessage {
                message_id: self.id.clone(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::new("m-1", "Finalist questionnaire", "grants@example.org", Utc::now())
            .with_body("Please complete the finalist questionnaire.")
            .with_tags(["scholarship"])
    }

    #[test]
    fn valid_message_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn blank_subject_rejected() {
        let mut msg = sample();
        msg.subject = "   ".into();
        let err = msg.validate().unwrap_err();
        assert!(matches!(err, AutomationError::InvalidMessage { ref reason, .. } if reason == "subject is empty"));
    }

    #[test]
    fn missing_sender_rejected() {
        let mut msg = sample();
        msg.from_address.clear();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn deserialize_with_optional_fields_missing() {
        let json = r#"{
            "id": "m-2",
            "subject": "Invoice 42",
            "from_address": "billing@vendor.com",
            "received_at": "2026-03-01T09:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.tags.is_empty());
        assert!(msg.body.is_empty());
        assert!(msg.validate().is_ok());
    }
}

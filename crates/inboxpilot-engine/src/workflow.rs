//! Workflow definitions: declarative automation rules.
//!
//! A workflow is plain data: a [`Trigger`] that decides whether the workflow
//! applies to a message and an ordered sequence of [`ActionSpec`]s that the
//! executor realizes when it does.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AutomationError, Result};

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// The type tag of an action.
///
/// Unrecognized, missing, null or non-string tags deserialize as
/// [`ActionKind::Custom`] so that an operator-authored workflow never aborts
/// a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ActionKind {
    /// Read and classify the message.
    Analysis,
    /// Prepare a reply for the sender.
    DraftReply,
    /// Submit a form or application on the operator's behalf.
    SubmitApplication,
    /// Send a WhatsApp-style confirmation to the operator.
    NotifyWhatsapp,
    /// Record progress in a tracker.
    UpdateTracker,
    /// Coordinate with other people (scheduling, hand-offs).
    Coordinate,
    /// Gather attachments or supporting documents.
    CollectDocuments,
    /// Operator-defined action; the detail text carries its meaning.
    #[default]
    Custom,
}

impl ActionKind {
    /// All kinds in declaration order.
    pub const ALL: [ActionKind; 8] = [
        Self::Analysis,
        Self::DraftReply,
        Self::SubmitApplication,
        Self::NotifyWhatsapp,
        Self::UpdateTracker,
        Self::Coordinate,
        Self::CollectDocuments,
        Self::Custom,
    ];

    /// The wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::DraftReply => "draft_reply",
            Self::SubmitApplication => "submit_application",
            Self::NotifyWhatsapp => "notify_whatsapp",
            Self::UpdateTracker => "update_tracker",
            Self::Coordinate => "coordinate",
            Self::CollectDocuments => "collect_documents",
            Self::Custom => "custom",
        }
    }

    /// Resolve a tag, falling back to [`ActionKind::Custom`].
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        match Self::ALL.iter().find(|k| k.as_str() == normalized) {
            Some(kind) => *kind,
            None => {
                tracing::debug!(tag = %tag, "unrecognized action type, treating as custom");
                Self::Custom
            }
        }
    }

    /// Whether actions of this kind produce an outbound notification.
    pub fn is_notification(self) -> bool {
        matches!(self, Self::NotifyWhatsapp)
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(lenient_tag(deserializer)?.map_or(Self::Custom, |tag| Self::from_tag(&tag)))
    }
}

/// A `type` value as written: a string, or anything else.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTag {
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Read a tag without failing: non-string values (null, numbers, tables)
/// come back as `None`.
fn lenient_tag<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTag::deserialize(deserializer)? {
        RawTag::Text(tag) => Ok(Some(tag)),
        RawTag::Other(_) => {
            tracing::debug!("non-string action type, treating as custom");
            Ok(None)
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Definition types
// ---------------------------------------------------------------------------

/// One step a workflow performs once triggered.
///
/// On the wire the type tag is the `type` field.  A tag that resolves to
/// [`ActionKind::Custom`] without literally saying `custom` is kept in
/// `custom_tag` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ActionSpecRepr", into = "ActionSpecRepr")]
pub struct ActionSpec {
    /// The action type.
    pub kind: ActionKind,
    /// Short summary, used as the log title.
    pub summary: String,
    /// Longer detail text, kept verbatim.
    pub detail: String,
    /// The operator's original tag when it was not a known kind.
    pub custom_tag: Option<String>,
}

impl ActionSpec {
    /// Create an action spec.
    pub fn new(kind: ActionKind, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            detail: detail.into(),
            custom_tag: None,
        }
    }

    /// The tag this spec serializes with.
    pub fn tag(&self) -> &str {
        self.custom_tag.as_deref().unwrap_or(self.kind.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct ActionSpecRepr {
    #[serde(rename = "type", default, deserialize_with = "lenient_tag")]
    tag: Option<String>,
    summary: String,
    #[serde(default)]
    detail: String,
}

impl From<ActionSpecRepr> for ActionSpec {
    fn from(repr: ActionSpecRepr) -> Self {
        let kind = repr
            .tag
            .as_deref()
            .map_or(ActionKind::Custom, ActionKind::from_tag);
        let custom_tag = repr
            .tag
            .filter(|tag| kind == ActionKind::Custom && !tag.trim().eq_ignore_ascii_case("custom"));
        Self {
            kind,
            summary: repr.summary,
            detail: repr.detail,
            custom_tag,
        }
    }
}

impl From<ActionSpec> for ActionSpecRepr {
    fn from(spec: ActionSpec) -> Self {
        Self {
            tag: Some(spec.tag().to_string()),
            summary: spec.summary,
            detail: spec.detail,
        }
    }
}

/// The declarative condition set that decides whether a workflow applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Keywords matched case-insensitively against subject, body and tags.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Categories compared against message tags for a score bonus.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Whether the matcher may pick this workflow automatically.  When
    /// `false` the workflow is only ever assigned by hand.
    #[serde(default = "default_true")]
    pub auto_detect: bool,
}

impl Default for Trigger {
    fn default() -> Self {
        Self::keywords(Vec::<String>::new())
    }
}

impl Trigger {
    /// A trigger that auto-detects on the given keywords.
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            categories: Vec::new(),
            auto_detect: true,
        }
    }

    /// Add categories to the trigger.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the workflow to manual assignment.
    pub fn manual_only(mut self) -> Self {
        self.auto_detect = false;
        self
    }
}

/// A named automation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// When this workflow applies.
    #[serde(default)]
    pub trigger: Trigger,
    /// The ordered actions to execute.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    /// Whether the workflow may run without human confirmation.
    #[serde(default)]
    pub autopilot: bool,
    /// Service-level agreement, in minutes.
    #[serde(default)]
    pub sla_minutes: u32,
    /// What success looks like for this workflow.
    #[serde(default)]
    pub success_metric: String,
    /// Highlight strings for display.
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Disabled workflows stay registered but never match.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl WorkflowDefinition {
    /// Create a new workflow with the given id, name and trigger.
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            trigger,
            actions: Vec::new(),
            autopilot: false,
            sla_minutes: 0,
            success_metric: String::new(),
            highlights: Vec::new(),
            enabled: true,
        }
    }

    /// Set the description for this workflow.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append an action.
    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    /// Mark the workflow as autopilot (no confirmation needed).
    pub fn with_autopilot(mut self, autopilot: bool) -> Self {
        self.autopilot = autopilot;
        self
    }

    /// Set the SLA in minutes.
    pub fn with_sla_minutes(mut self, minutes: u32) -> Self {
        self.sla_minutes = minutes;
        self
    }

    /// Check the required text fields.
    ///
    /// An empty action list is tolerated here; the executor simply produces
    /// no actions for it.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| AutomationError::InvalidWorkflow {
            workflow_id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id is empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if let Some(index) = self.actions.iter().position(|a| a.summary.trim().is_empty()) {
            return Err(invalid(format!("action {index} has an empty summary")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_tags_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_tag_falls_back_to_custom() {
        assert_eq!(ActionKind::from_tag("fax_the_lawyer"), ActionKind::Custom);
        assert_eq!(ActionKind::from_tag(" Notify_WhatsApp "), ActionKind::NotifyWhatsapp);
    }

    #[test]
    fn unknown_tag_in_json_keeps_detail() {
        let json = r#"{"type": "teleport", "summary": "Beam up", "detail": "  exact text  "}"#;
        let spec: ActionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind, ActionKind::Custom);
        assert_eq!(spec.detail, "  exact text  ");
    }

    #[test]
    fn missing_null_or_non_string_type_is_custom() {
        for json in [
            r#"{"summary": "Do it", "detail": " as written "}"#,
            r#"{"type": null, "summary": "Do it", "detail": " as written "}"#,
            r#"{"type": 7, "summary": "Do it", "detail": " as written "}"#,
        ] {
            let spec: ActionSpec = serde_json::from_str(json).unwrap();
            assert_eq!(spec.kind, ActionKind::Custom, "{json}");
            assert_eq!(spec.detail, " as written ");
            assert!(spec.custom_tag.is_none());
        }
    }

    #[test]
    fn toml_action_without_type_is_custom() {
        let toml = r#"
            id = "wf"
            name = "Workflow"

            [[actions]]
            summary = "Untyped"

            [[actions]]
            type = { weird = true }
            summary = "Table typed"
        "#;
        let wf: WorkflowDefinition = toml::from_str(toml).unwrap();
        assert!(wf.actions.iter().all(|a| a.kind == ActionKind::Custom));
    }

    #[test]
    fn unknown_tag_survives_round_trip() {
        let json = r#"{"type": "fax_the_lawyer", "summary": "Fax", "detail": ""}"#;
        let spec: ActionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind, ActionKind::Custom);
        assert_eq!(spec.tag(), "fax_the_lawyer");

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "fax_the_lawyer");
        let back: ActionSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn known_tag_keeps_no_custom_text() {
        let spec: ActionSpec =
            serde_json::from_str(r#"{"type": " Draft_Reply ", "summary": "Reply"}"#).unwrap();
        assert_eq!(spec.kind, ActionKind::DraftReply);
        assert!(spec.custom_tag.is_none());
        assert_eq!(serde_json::to_value(&spec).unwrap()["type"], "draft_reply");
    }

    #[test]
    fn lenient_kind_in_executed_records() {
        let kind: ActionKind = serde_json::from_str("null").unwrap();
        assert_eq!(kind, ActionKind::Custom);
        let kind: ActionKind = serde_json::from_str(r#""update_tracker""#).unwrap();
        assert_eq!(kind, ActionKind::UpdateTracker);
    }

    #[test]
    fn only_notify_whatsapp_notifies() {
        let notifying: Vec<_> = ActionKind::ALL
            .iter()
            .filter(|k| k.is_notification())
            .collect();
        assert_eq!(notifying, vec![&ActionKind::NotifyWhatsapp]);
    }

    #[test]
    fn defaults_when_deserializing() {
        let json = r#"{"id": "wf", "name": "Workflow", "trigger": {"keywords": ["a"]}}"#;
        let wf: WorkflowDefinition = serde_json::from_str(json).unwrap();
        assert!(wf.trigger.auto_detect);
        assert!(wf.enabled);
        assert!(!wf.autopilot);
        assert!(wf.actions.is_empty());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let wf = WorkflowDefinition::new("wf-1", " ", Trigger::keywords(["x"]));
        assert!(matches!(
            wf.validate(),
            Err(AutomationError::InvalidWorkflow { .. })
        ));
    }

    #[test]
    fn validate_rejects_blank_action_summary() {
        let wf = WorkflowDefinition::new("wf-1", "Name", Trigger::keywords(["x"]))
            .with_action(ActionSpec::new(ActionKind::Analysis, "", "detail"));
        let err = wf.validate().unwrap_err();
        assert!(err.to_string().contains("action 0"));
    }
}

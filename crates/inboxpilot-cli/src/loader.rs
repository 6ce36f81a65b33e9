//! Reading workflow and message files from disk.
//!
//! Workflows come from TOML (a list of `[[workflow]]` tables) or JSON (an
//! array of definitions), chosen by file extension.  Messages are JSON: a
//! single object or an array.

use std::path::Path;

use anyhow::{Context, Result, bail};
use inboxpilot_engine::{Message, WorkflowDefinition};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    #[serde(default, rename = "workflow")]
    workflows: Vec<WorkflowDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageFile {
    Many(Vec<Message>),
    One(Box<Message>),
}

/// Load workflow definitions from a `.toml` or `.json` file.
pub fn load_workflows(path: &Path) -> Result<Vec<WorkflowDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read workflows from {}", path.display()))?;

    let definitions = match extension(path).as_deref() {
        Some("toml") => {
            let file: WorkflowFile = toml::from_str(&content)
                .with_context(|| format!("invalid workflow TOML in {}", path.display()))?;
            file.workflows
        }
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid workflow JSON in {}", path.display()))?,
        other => bail!(
            "unsupported workflow file extension {:?} for {} (expected .toml or .json)",
            other.unwrap_or_default(),
            path.display()
        ),
    };

    tracing::debug!(path = %path.display(), count = definitions.len(), "workflows loaded");
    Ok(definitions)
}

/// Load one message or an array of messages from a JSON file.
pub fn load_messages(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read messages from {}", path.display()))?;
    let file: MessageFile = serde_json::from_str(&content)
        .with_context(|| format!("invalid message JSON in {}", path.display()))?;

    let messages = match file {
        MessageFile::Many(messages) => messages,
        MessageFile::One(message) => vec![*message],
    };
    tracing::debug!(path = %path.display(), count = messages.len(), "messages loaded");
    Ok(messages)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use inboxpilot_engine::ActionKind;

    use super::*;

    const WORKFLOWS_TOML: &str = r#"
        [[workflow]]
        id = "invoices"
        name = "Invoice triage"
        sla_minutes = 240

        [workflow.trigger]
        keywords = ["invoice", "payment due"]
        categories = ["finance"]

        [[workflow.actions]]
        type = "update_tracker"
        summary = "Log invoice"
        detail = "Add the invoice to the ledger"

        [[workflow.actions]]
        type = "notify_whatsapp"
        summary = "Ping operator"

        [[workflow]]
        id = "manual"
        name = "Manual only"
        trigger = { auto_detect = false }
    "#;

    #[test]
    fn loads_toml_workflows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.toml");
        fs::write(&path, WORKFLOWS_TOML).unwrap();

        let defs = load_workflows(&path).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].id, "invoices");
        assert_eq!(defs[0].sla_minutes, 240);
        assert_eq!(defs[0].trigger.keywords, vec!["invoice", "payment due"]);
        assert_eq!(defs[0].actions[1].kind, ActionKind::NotifyWhatsapp);
        assert!(defs[0].actions[1].detail.is_empty());
        assert!(!defs[1].trigger.auto_detect);
    }

    #[test]
    fn loads_json_workflows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.JSON");
        fs::write(
            &path,
            r#"[{"id": "wf", "name": "WF", "trigger": {"keywords": ["x"]},
                 "actions": [{"type": "mystery", "summary": "Do it"}]}]"#,
        )
        .unwrap();

        let defs = load_workflows(&path).unwrap();
        assert_eq!(defs[0].actions[0].kind, ActionKind::Custom);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.yaml");
        fs::write(&path, "").unwrap();
        assert!(load_workflows(&path).is_err());
    }

    #[test]
    fn loads_single_and_many_messages() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.json");
        fs::write(
            &one,
            r#"{"id": "m-1", "subject": "Invoice", "from_address": "a@b.c",
                "received_at": "2026-05-04T08:30:00Z"}"#,
        )
        .unwrap();
        let many = dir.path().join("many.json");
        fs::write(
            &many,
            r#"[{"id": "m-1", "subject": "A", "from_address": "a@b.c", "received_at": "2026-05-04T08:30:00Z"},
                {"id": "m-2", "subject": "B", "from_address": "a@b.c", "received_at": "2026-05-04T08:31:00Z",
                 "tags": ["finance"]}]"#,
        )
        .unwrap();

        assert_eq!(load_messages(&one).unwrap()[0].id, "m-1");
        let messages = load_messages(&many).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].tags, vec!["finance"]);
    }

    #[test]
    fn bundled_samples_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let defs = load_workflows(&root.join("config/workflows.toml")).unwrap();
        let snapshot = inboxpilot_engine::RegistrySnapshot::new(defs).unwrap();
        assert!(snapshot.get("scholarship").is_some());

        let messages = load_messages(&root.join("samples/messages.json")).unwrap();
        assert_eq!(messages.len(), 6);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_messages(Path::new("/nonexistent/inbox.json")).unwrap_err();
        assert!(err.to_string().contains("inbox.json"));
    }
}

//! Trigger matcher.
//!
//! Decides which workflows apply to a message.  Scoring:
//!
//! | Signal | Points |
//! |--------|--------|
//! | each distinct trigger keyword found in subject, body or tags | 1 |
//! | any trigger category equal to any message tag | `category_bonus` |
//!
//! Keywords are found with the workflow's precompiled [`aho_corasick`]
//! automaton over a lowercased haystack, so matching is a case-insensitive
//! substring test.  A workflow without keywords never matches, whatever its
//! categories say.  Results are ordered by descending score; ties keep
//! registry definition order.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::registry::{CompiledWorkflow, RegistrySnapshot};

/// One workflow selected for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMatch {
    /// The matched workflow.
    pub workflow_id: String,
    /// Its display name, carried for summaries.
    pub workflow_name: String,
    /// Raw match score (> 0).
    pub score: u32,
    /// Best score this workflow could reach.
    pub max_score: u32,
    /// Copied from the definition.
    pub autopilot: bool,
    /// Copied from the definition.
    pub sla_minutes: u32,
}

impl WorkflowMatch {
    /// `score / max_score`, clamped to `[0, 1]`.
    pub fn strength(&self) -> f64 {
        if self.max_score == 0 {
            return 0.0;
        }
        (f64::from(self.score) / f64::from(self.max_score)).clamp(0.0, 1.0)
    }
}

/// Keyword/category trigger matcher.
#[derive(Debug, Clone, Copy)]
pub struct TriggerMatcher {
    category_bonus: u32,
}

impl TriggerMatcher {
    /// Create a matcher awarding `category_bonus` points for a category hit.
    pub fn new(category_bonus: u32) -> Self {
        Self { category_bonus }
    }

    /// Score every auto-detect workflow in `snapshot` against `message`.
    ///
    /// Returns an empty list when nothing applies.
    pub fn match_message(&self, message: &Message, snapshot: &RegistrySnapshot) -> Vec<WorkflowMatch> {
        let haystack = haystack(message);
        let tags: Vec<String> = message
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut matches: Vec<WorkflowMatch> = snapshot
            .iter()
            .filter(|w| w.definition().enabled && w.definition().trigger.auto_detect)
            .filter_map(|w| {
                let score = self.score(w, &haystack, &tags);
                if score == 0 {
                    return None;
                }
                tracing::debug!(
                    message_id = %message.id,
                    workflow_id = %w.id(),
                    score,
                    "workflow matched"
                );
                Some(WorkflowMatch {
                    workflow_id: w.id().to_string(),
                    workflow_name: w.definition().name.clone(),
                    score,
                    max_score: self.max_score(w),
                    autopilot: w.definition().autopilot,
                    sla_minutes: w.definition().sla_minutes,
                })
            })
            .collect();

        // Stable: equal scores stay in definition order.
        matches.sort_by(|a, b| b.score.cmp(&a.score));

        if matches.is_empty() {
            tracing::debug!(message_id = %message.id, "no workflow matched");
        }

        matches
    }

    /// The highest score `workflow` can reach.
    pub fn max_score(&self, workflow: &CompiledWorkflow) -> u32 {
        let bonus = if workflow.categories.is_empty() {
            0
        } else {
            self.category_bonus
        };
        count_u32(workflow.keywords.len()).saturating_add(bonus)
    }

    fn score(&self, workflow: &CompiledWorkflow, haystack: &str, tags: &[String]) -> u32 {
        let Some(ac) = workflow.automaton.as_ref() else {
            return 0;
        };

        let mut found = vec![false; workflow.keywords.len()];
        for mat in ac.find_overlapping_iter(haystack) {
            found[mat.pattern().as_usize()] = true;
        }
        let keyword_hits = count_u32(found.iter().filter(|hit| **hit).count());

        let category_hit = workflow
            .categories
            .iter()
            .any(|category| tags.iter().any(|tag| tag == category));

        if category_hit {
            keyword_hits.saturating_add(self.category_bonus)
        } else {
            keyword_hits
        }
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Subject, body and tags, lowercased, one per line so a keyword cannot
/// straddle two fields.
fn haystack(message: &Message) -> String {
    let mut text = String::with_capacity(
        message.subject.len() + message.body.len() + message.tags.iter().map(String::len).sum::<usize>() + 8,
    );
    text.push_str(&message.subject);
    text.push('\n');
    text.push_str(&message.body);
    for tag in &message.tags {
        text.push('\n');
        text.push_str(tag);
    }
    text.to_lowercase()
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

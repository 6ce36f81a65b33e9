//! Workflow registry.
//!
//! Authoring happens against a [`WorkflowRegistry`]; evaluations run against
//! an immutable [`RegistrySnapshot`].  Every mutation builds a fresh snapshot
//! and swaps it in, so a snapshot taken before the mutation keeps seeing the
//! old set of workflows for as long as it lives.
//!
//! Snapshots hold each trigger precompiled into a case-insensitive
//! [`AhoCorasick`] automaton, built once per mutation instead of once per
//! message.
//!
//! # Example
//!
//! ```rust
//! # use inboxpilot_engine::registry::WorkflowRegistry;
//! # use inboxpilot_engine::workflow::{Trigger, WorkflowDefinition};
//! let registry = WorkflowRegistry::new();
//! registry
//!     .insert(WorkflowDefinition::new("invoices", "Invoice triage", Trigger::keywords(["invoice"])))
//!     .unwrap();
//!
//! let snapshot = registry.snapshot().unwrap();
//! registry.remove("invoices").unwrap();
//!
//! assert_eq!(snapshot.len(), 1);
//! assert!(registry.snapshot().unwrap().is_empty());
//! ```

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use aho_corasick::AhoCorasick;

use crate::error::{AutomationError, Result};
use crate::workflow::WorkflowDefinition;

// ---------------------------------------------------------------------------
// Compiled workflow
// ---------------------------------------------------------------------------

/// A validated workflow definition with its trigger precompiled.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    definition: WorkflowDefinition,
    /// Trimmed, lowercased, de-duplicated, non-empty keywords.
    pub(crate) keywords: Vec<String>,
    /// Trimmed, lowercased, non-empty categories.
    pub(crate) categories: Vec<String>,
    /// Automaton over `keywords`; `None` when there are none.
    pub(crate) automaton: Option<AhoCorasick>,
}

impl CompiledWorkflow {
    /// Validate and compile a definition.
    pub fn compile(definition: WorkflowDefinition) -> Result<Self> {
        definition.validate()?;

        let mut keywords: Vec<String> = Vec::with_capacity(definition.trigger.keywords.len());
        for keyword in &definition.trigger.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        let categories = definition
            .trigger
            .categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        let automaton = if keywords.is_empty() {
            None
        } else {
            let ac = AhoCorasick::new(&keywords).map_err(|e| AutomationError::InvalidWorkflow {
                workflow_id: definition.id.clone(),
                reason: format!("failed to compile keywords: {e}"),
            })?;
            Some(ac)
        };

        tracing::trace!(
            workflow_id = %definition.id,
            keywords = keywords.len(),
            "workflow trigger compiled"
        );

        Ok(Self {
            definition,
            keywords,
            categories,
            automaton,
        })
    }

    /// The underlying definition.
    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Shorthand for `definition().id`.
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// The normalized keywords the matcher counts.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable, cheaply cloneable view of the registry.
///
/// Definition order is preserved; the matcher uses it to break score ties.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    workflows: Arc<[CompiledWorkflow]>,
}

impl RegistrySnapshot {
    /// Validate and compile a list of definitions into a snapshot.
    pub fn new(definitions: Vec<WorkflowDefinition>) -> Result<Self> {
        let compiled = definitions
            .into_iter()
            .map(CompiledWorkflow::compile)
            .collect::<Result<Vec<_>>>()?;
        Self::from_compiled(compiled)
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_compiled(compiled: Vec<CompiledWorkflow>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(compiled.len());
        for workflow in &compiled {
            if !seen.insert(workflow.id()) {
                return Err(AutomationError::DuplicateWorkflow {
                    workflow_id: workflow.id().to_string(),
                });
            }
        }
        Ok(Self {
            workflows: compiled.into(),
        })
    }

    /// Iterate workflows in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledWorkflow> {
        self.workflows.iter()
    }

    /// Look up a workflow by id.
    pub fn get(&self, id: &str) -> Option<&WorkflowDefinition> {
        self.workflows
            .iter()
            .find(|w| w.id() == id)
            .map(CompiledWorkflow::definition)
    }

    /// Look up a compiled workflow by id.
    pub(crate) fn compiled(&self, id: &str) -> Option<&CompiledWorkflow> {
        self.workflows.iter().find(|w| w.id() == id)
    }

    /// Number of workflows.
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Whether the snapshot holds no workflows.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Clone out the plain definitions, in order.
    pub fn definitions(&self) -> Vec<WorkflowDefinition> {
        self.workflows.iter().map(|w| w.definition.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Copy-on-write workflow registry.
///
/// The registry is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    current: Arc<RwLock<RegistrySnapshot>>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the given definitions.
    pub fn from_definitions(definitions: Vec<WorkflowDefinition>) -> Result<Self> {
        let snapshot = RegistrySnapshot::new(definitions)?;
        Ok(Self {
            current: Arc::new(RwLock::new(snapshot)),
        })
    }

    /// Take a snapshot for one or more evaluations.
    pub fn snapshot(&self) -> Result<RegistrySnapshot> {
        let guard = self.current.read().map_err(|e| {
            AutomationError::Internal(format!("failed to acquire read lock on registry: {e}"))
        })?;
        Ok(guard.clone())
    }

    /// Register a new workflow.  Fails if the id is already taken.
    pub fn insert(&self, definition: WorkflowDefinition) -> Result<()> {
        let compiled = CompiledWorkflow::compile(definition)?;
        self.mutate(|workflows| {
            if workflows.iter().any(|w| w.id() == compiled.id()) {
                return Err(AutomationError::DuplicateWorkflow {
                    workflow_id: compiled.id().to_string(),
                });
            }
            tracing::info!(workflow_id = %compiled.id(), "workflow registered");
            workflows.push(compiled);
            Ok(())
        })
    }

    /// Register or replace a workflow.  A replaced workflow keeps its
    /// position in definition order.
    pub fn upsert(&self, definition: WorkflowDefinition) -> Result<()> {
        let compiled = CompiledWorkflow::compile(definition)?;
        self.mutate(|workflows| {
            match workflows.iter().position(|w| w.id() == compiled.id()) {
                Some(index) => {
                    tracing::info!(workflow_id = %compiled.id(), "workflow replaced");
                    workflows[index] = compiled;
                }
                None => {
                    tracing::info!(workflow_id = %compiled.id(), "workflow registered");
                    workflows.push(compiled);
                }
            }
            Ok(())
        })
    }

    /// Remove a workflow and return its definition.
    pub fn remove(&self, id: &str) -> Result<WorkflowDefinition> {
        let mut removed = None;
        self.mutate(|workflows| {
            let index = workflows.iter().position(|w| w.id() == id).ok_or_else(|| {
                AutomationError::WorkflowNotFound {
                    workflow_id: id.to_string(),
                }
            })?;
            removed = Some(workflows.remove(index).definition);
            Ok(())
        })?;
        tracing::info!(workflow_id = %id, "workflow removed");
        removed.ok_or_else(|| AutomationError::Internal("removed workflow vanished".into()))
    }

    /// Retrieve a copy of a workflow definition.
    pub fn get(&self, id: &str) -> Result<WorkflowDefinition> {
        self.snapshot()?
            .get(id)
            .cloned()
            .ok_or_else(|| AutomationError::WorkflowNotFound {
                workflow_id: id.to_string(),
            })
    }

    /// Return all workflow ids in definition order.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.iter().map(|w| w.id().to_string()).collect())
    }

    /// Return the number of registered workflows.
    pub fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }

    /// Build a new snapshot from the current one and swap it in.
    fn mutate<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<CompiledWorkflow>) -> Result<()>,
    {
        let mut guard = self.current.write().map_err(|e| {
            AutomationError::Internal(format!("failed to acquire write lock on registry: {e}"))
        })?;
        let mut workflows: Vec<CompiledWorkflow> = guard.iter().cloned().collect();
        edit(&mut workflows)?;
        *guard = RegistrySnapshot::from_compiled(workflows)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Message-to-workflow automation engine for InboxPilot.
//!
//! This crate decides which predefined workflows apply to an inbound
//! email-like message and simulates running them:
//!
//! - **[`registry`]** -- Copy-on-write workflow registry with immutable,
//!   precompiled snapshots.
//! - **[`matcher`]** -- Keyword/category trigger matching via
//!   [`aho_corasick`], ordered by score then definition order.
//! - **[`executor`]** -- Simulated action execution with one audit log entry
//!   per action.
//! - **[`notify`]** -- Operator notifications for `notify_whatsapp` actions.
//! - **[`aggregate`]** -- The final [`ProcessedResult`] with confidence and
//!   summary.
//! - **[`velocity`]** -- Actions-per-minute throughput over recent results.
//! - **[`engine`]** -- [`AutomationEngine`], which runs the stages above.
//!
//! The engine is a pure, synchronous function of its inputs.  Time and
//! simulated runtimes are injected through [`clock`].
//!
//! # Example
//!
//! ```rust
//! # use chrono::Utc;
//! # use inboxpilot_engine::{
//! #     ActionKind, ActionSpec, AutomationEngine, EngineConfig, Message, Trigger,
//! #     WorkflowDefinition, WorkflowRegistry,
//! # };
//! let registry = WorkflowRegistry::new();
//! registry
//!     .insert(
//!         WorkflowDefinition::new("grants", "Scholarship desk", Trigger::keywords(["scholarship"]))
//!             .with_action(ActionSpec::new(
//!                 ActionKind::SubmitApplication,
//!                 "Submit questionnaire",
//!                 "Fill in and submit the finalist questionnaire",
//!             )),
//!     )
//!     .unwrap();
//!
//! let engine = AutomationEngine::new(EngineConfig::default()).unwrap();
//! let message = Message::new("m-1", "Finalist questionnaire", "grants@example.org", Utc::now())
//!     .with_tags(["scholarship"]);
//!
//! let evaluation = engine.evaluate(message, &registry.snapshot().unwrap()).unwrap();
//! assert_eq!(evaluation.result.matched_workflow_ids, vec!["grants"]);
//! assert_eq!(evaluation.log.len(), 1);
//! ```

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod message;
pub mod notify;
pub mod registry;
pub mod velocity;
pub mod workflow;

// Re-export the most commonly used types at the crate root for convenience.
pub use aggregate::ProcessedResult;
pub use clock::{Clock, FixedClock, RuntimeModel, SteppingClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{AutomationEngine, Evaluation};
pub use error::{AutomationError, Result};
pub use executor::{ExecutedAction, LogEntry};
pub use matcher::{TriggerMatcher, WorkflowMatch};
pub use message::Message;
pub use notify::Notification;
pub use registry::{RegistrySnapshot, WorkflowRegistry};
pub use velocity::velocity;
pub use workflow::{ActionKind, ActionSpec, Trigger, WorkflowDefinition};

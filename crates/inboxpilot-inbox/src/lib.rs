//! Caller-side state for the InboxPilot engine.
//!
//! The engine evaluates one message at a time and remembers nothing.  This
//! crate owns what lives around it:
//!
//! - **[`inbox`]** -- Pending queue, bounded history, activity and
//!   notification feeds, and the rejected list.
//! - **[`batch`]** -- Bounded-concurrency evaluation of many messages on the
//!   tokio blocking pool.
//! - **[`config`]** -- The `[inbox]` configuration section.

pub mod batch;
pub mod config;
pub mod error;
pub mod inbox;

pub use batch::{BatchItem, BatchRunner};
pub use config::InboxConfig;
pub use error::{InboxError, Result};
pub use inbox::{Inbox, ProcessOutcome, Rejected};

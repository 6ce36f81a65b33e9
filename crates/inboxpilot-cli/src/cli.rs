//! CLI argument definitions for InboxPilot.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inboxpilot_engine::config::DEFAULT_CONFIG_PATH;

/// InboxPilot -- message-to-workflow automation.
#[derive(Parser)]
#[command(
    name = "inboxpilot",
    version,
    about = "InboxPilot -- message-to-workflow automation",
    long_about = "Matches inbound messages against predefined workflows, simulates their \
                  actions, and reports notifications, confidence and throughput."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Seed for simulated action runtimes (overrides config and environment).
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate messages one by one and print each evaluation as JSON.
    Run {
        /// Workflow definitions (`.toml` or `.json`).
        #[arg(long, short)]
        workflows: PathBuf,

        /// A message, or an array of messages, as JSON.
        #[arg(long, short)]
        message: PathBuf,
    },

    /// Validate workflow definitions and list them.
    Check {
        /// Workflow definitions (`.toml` or `.json`).
        #[arg(long, short)]
        workflows: PathBuf,
    },

    /// Process a message file through the inbox with concurrent workers.
    Batch {
        /// Workflow definitions (`.toml` or `.json`).
        #[arg(long, short)]
        workflows: PathBuf,

        /// A message, or an array of messages, as JSON.
        #[arg(long, short)]
        messages: PathBuf,

        /// Concurrent evaluations (defaults to `[inbox] max_workers`).
        #[arg(long)]
        workers: Option<usize>,
    },
}

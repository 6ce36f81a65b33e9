//! CLI entry point for InboxPilot.
//!
//! This binary provides the `inboxpilot` command: evaluate messages against
//! a workflow file, validate workflow files, and run whole inboxes through
//! the batch runner.

mod cli;
mod loader;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use inboxpilot_engine::{AutomationEngine, EngineConfig, RegistrySnapshot};
use inboxpilot_inbox::{BatchRunner, Inbox, InboxConfig, ProcessOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Run {
            ref workflows,
            ref message,
        } => cmd_run(&cli, workflows, message),
        Commands::Check { ref workflows } => cmd_check(workflows),
        Commands::Batch {
            ref workflows,
            ref messages,
            workers,
        } => cmd_batch(&cli, workflows, messages, workers).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: run
// ---------------------------------------------------------------------------

fn cmd_run(cli: &Cli, workflows: &Path, message: &Path) -> Result<()> {
    let engine = build_engine(cli)?;
    let snapshot = load_snapshot(workflows)?;

    for message in loader::load_messages(message)? {
        let id = message.id.clone();
        let evaluation = engine
            .evaluate(message, &snapshot)
            .with_context(|| format!("failed to evaluate message `{id}`"))?;
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: check
// ---------------------------------------------------------------------------

fn cmd_check(workflows: &Path) -> Result<()> {
    let snapshot = load_snapshot(workflows)?;

    println!("{} workflow(s) in {}", snapshot.len(), workflows.display());
    for workflow in snapshot.iter() {
        let def = workflow.definition();
        let mode = match (def.enabled, def.trigger.auto_detect) {
            (false, _) => "disabled",
            (true, false) => "manual",
            (true, true) if def.autopilot => "autopilot",
            (true, true) => "confirm",
        };
        println!(
            "  {:<24} {:<10} keywords={:<3} actions={:<3} {}",
            def.id,
            mode,
            workflow.keywords().len(),
            def.actions.len(),
            def.name
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: batch
// ---------------------------------------------------------------------------

async fn cmd_batch(cli: &Cli, workflows: &Path, messages: &Path, workers: Option<usize>) -> Result<()> {
    let engine = build_engine(cli)?;
    let inbox_config = InboxConfig::load(&cli.config).context("failed to load inbox configuration")?;
    let runner = BatchRunner::new(workers.unwrap_or(inbox_config.max_workers))?;
    let snapshot = load_snapshot(workflows)?;

    let mut inbox = Inbox::new(inbox_config)?;
    for message in loader::load_messages(messages)? {
        inbox.enqueue(Arc::new(message));
    }
    info!(pending = inbox.pending_len(), workers = runner.max_workers(), "starting batch");

    let outcomes = inbox.process_batch(&runner, &engine, &snapshot).await?;

    for outcome in &outcomes {
        match outcome {
            ProcessOutcome::Processed {
                message_id,
                confidence,
                summary,
                ..
            } => println!("  {message_id:<20} {confidence:>5.2}  {summary}"),
            ProcessOutcome::Rejected { message_id, reason } => {
                println!("  {message_id:<20} rejected  {reason}")
            }
        }
    }
    println!();
    println!("  processed:     {}", inbox.history().count());
    println!("  rejected:      {}", inbox.rejected().len());
    println!("  notifications: {}", inbox.notifications().count());
    println!("  velocity:      {:.1} actions/min", inbox.velocity(&engine));
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Config file, then `INBOXPILOT_*` environment, then `--seed`.
fn build_engine(cli: &Cli) -> Result<AutomationEngine> {
    let mut config = EngineConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?
        .with_env_overrides()?;
    if let Some(seed) = cli.seed {
        config.runtime = config.runtime.with_seed(seed);
    }
    Ok(AutomationEngine::new(config)?)
}

fn load_snapshot(path: &Path) -> Result<RegistrySnapshot> {
    let definitions = loader::load_workflows(path)?;
    RegistrySnapshot::new(definitions).with_context(|| format!("invalid workflows in {}", path.display()))
}

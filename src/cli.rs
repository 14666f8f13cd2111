//! CLI interface for checkin.
//!
//! Meant to run unattended from cron or a systemd timer, but every command
//! is also safe to run by hand:
//!
//! - `checkin run`: one pass over the registry.
//! - `checkin status`: what the state file says.
//! - `checkin targets`: the registry and which credentials are present.
//!
//! Credentials come from environment variables named by each target.

mod format;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::Zoned;
use jiff::civil::Date;
use tracing::info_span;
use uuid::Uuid;

use crate::config::Config;
use crate::credentials::{CredentialSource, EnvCredentials};
use crate::fetch::HttpFetcher;
use crate::notify::{self, NoopNotifier, Notifier};
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::registry::Registry;
use crate::storage::{JsonFileStore, StateStore};

use format::{format_outcome, format_status_row, format_target_row};

/// Daily check-in runner.
#[derive(Debug, Parser)]
#[command(name = "checkin", version, after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Config file (default: `~/.checkin/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State file, overriding `state-file` from the config.
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const USAGE_HELP: &str = r#"Typical setup:
  export HDTIME_cookie='c_secure_uid=...; c_secure_pass=...'
  checkin targets          # confirm the credential is picked up
  checkin run --dry-run    # see which targets a run would check in
  checkin run              # check in for real (e.g. daily from cron)

Logging goes to stderr; set RUST_LOG=debug for request-level detail."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check in to every active target not yet done today.
    ///
    /// Saves the state file once, then sends the report if any target
    /// was processed. Exits non-zero only if the state file cannot be
    /// read or written.
    Run {
        /// Treat this date as today (YYYY-MM-DD). Defaults to the local date.
        #[arg(long)]
        today: Option<Date>,

        /// Only process these target ids. Can be specified multiple times.
        #[arg(long)]
        only: Vec<String>,

        /// Log the report instead of sending it.
        #[arg(long)]
        no_notify: bool,

        /// List the targets due today without contacting any site or
        /// touching the state file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the recorded state of every target.
    Status,

    /// List the registry and whether each credential is present.
    Targets,
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let registry =
        Registry::from_config(&config).map_err(|e| format!("invalid target registry: {e}"))?;

    let state_path = match cli.state {
        Some(path) => path,
        None => config
            .state_path()
            .ok_or("could not determine home directory")?,
    };
    let store = JsonFileStore::new(state_path);

    match cli.command {
        Command::Run {
            today,
            only,
            no_notify,
            dry_run,
        } => {
            let options = RunOptions {
                today: today.unwrap_or_else(|| Zoned::now().date()),
                only,
                notify: !(no_notify || dry_run),
                dry_run,
            };
            cmd_run(&config, &registry, &store, options)
        }
        Command::Status => cmd_status(&registry, &store, &EnvCredentials),
        Command::Targets => cmd_targets(&registry, &EnvCredentials),
    }
}

struct RunOptions {
    today: Date,
    only: Vec<String>,
    notify: bool,
    dry_run: bool,
}

fn cmd_run(
    config: &Config,
    registry: &Registry,
    store: &JsonFileStore,
    options: RunOptions,
) -> Result<(), String> {
    if let Some(unknown) = options.only.iter().find(|id| registry.get(id).is_none()) {
        return Err(format!("unknown target: {unknown}"));
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, today = %options.today);
    let _enter = span.enter();

    let fetcher = HttpFetcher::new(&config.user_agent, config.timeout())
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;
    let notifier: Box<dyn Notifier> = if options.notify {
        notify::from_config(&config.notify, config.timeout())
            .map_err(|e| format!("failed to set up notifier: {e}"))?
    } else {
        Box::new(NoopNotifier)
    };

    let _lock = if options.dry_run {
        None
    } else {
        let lock = store
            .lock(run_id)
            .map_err(|e| format!("failed to take run lock: {e}"))?;
        Some(lock)
    };

    let summary = Orchestrator::new(registry, &EnvCredentials, &fetcher, store, notifier.as_ref())
        .with_retry(config.retry_policy())
        .only(options.only)
        .preview(options.dry_run)
        .run(options.today)
        .map_err(|e| format!("run aborted: {e}"))?;

    print_summary(&summary);
    if options.dry_run {
        eprintln!("Dry run: no site contacted, {} not modified", store.path().display());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.outcomes.is_empty() {
        println!("No targets selected");
        return;
    }
    for (id, outcome) in &summary.outcomes {
        println!("{id:<12} {}", format_outcome(*outcome));
    }
}

fn cmd_status(
    registry: &Registry,
    store: &JsonFileStore,
    credentials: &dyn CredentialSource,
) -> Result<(), String> {
    let mut doc = store
        .load(registry)
        .map_err(|e| format!("failed to read state: {e}"))?;
    doc.active = registry.active_ids(credentials);
    let today = Zoned::now().date();

    println!("State: {}", store.path().display());
    for (id, state) in &doc.targets {
        let is_active = doc.active.contains(id);
        println!("{}", format_status_row(id, state, is_active, today));
    }
    println!(
        "{} targets, {} active, {} done today",
        doc.total,
        doc.active.len(),
        doc.completed_on(today)
    );

    Ok(())
}

fn cmd_targets(registry: &Registry, credentials: &dyn CredentialSource) -> Result<(), String> {
    if registry.is_empty() {
        println!("No targets");
        return Ok(());
    }

    for target in registry.iter() {
        let present = credentials.credential(&target.credential_key).is_some();
        println!("{}", format_target_row(target, present));
    }

    Ok(())
}

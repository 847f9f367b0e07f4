//! Live view reconciler for agent chat sessions.
//!
//! Replays recorded agent event logs through the reconciler and validates
//! them. The live server is the separate `coagent-ui` binary.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use coagent::core::pending::ResolutionPolicy;
use coagent::exit_codes;
use coagent::io::config::{CoagentConfig, CoagentPaths, load_config, write_config};
use coagent::io::event_log::load_events;
use coagent::replay::{replay, with_policy};
use coagent::validate::validate_event_log;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "coagent",
    version,
    about = "Reconcile agent state into live views and prompts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default `.coagent/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Drive a session over a recorded event log and print what it renders.
    Replay {
        /// JSONL file with one agent event per line.
        events: PathBuf,
        /// Resolution policy for every prompt (defaults to the config's).
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Check an event log against the event schema and snapshot invariants.
    Validate {
        /// JSONL file with one agent event per line.
        events: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Manual,
    Automatic,
}

impl From<PolicyArg> for ResolutionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Manual => ResolutionPolicy::Manual,
            PolicyArg::Automatic => ResolutionPolicy::Automatic,
        }
    }
}

fn main() {
    coagent::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = CoagentPaths::new(".");
    match cli.command {
        Command::Init { force } => cmd_init(&paths.config_path, force),
        Command::Replay { events, policy } => cmd_replay(&paths.config_path, &events, policy),
        Command::Validate { events } => cmd_validate(&events),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if !force && config_path.exists() {
        info!(path = %config_path.display(), "config exists, keeping it");
        return Ok(());
    }
    write_config(config_path, &CoagentConfig::default())
        .with_context(|| format!("write {}", config_path.display()))
}

fn cmd_replay(config_path: &Path, events_path: &Path, policy: Option<PolicyArg>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(policy) = policy {
        config = with_policy(config, policy.into());
    }
    let events = load_events(events_path)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build tokio runtime")?;
    let mut stdout = io::stdout().lock();
    runtime.block_on(replay(events, config, &mut stdout))?;
    Ok(())
}

fn cmd_validate(events_path: &Path) -> Result<()> {
    let report = validate_event_log(events_path)?;
    if !report.is_valid() {
        bail!(
            "{}: event log violations:\n- {}",
            events_path.display(),
            report.violations.join("\n- ")
        );
    }
    println!("{} events ok", report.events);
    Ok(())
}

//! eventbeacon - command line host for the event telemetry agent
//!
//! This tool provides commands for:
//! - Checking agent configuration
//! - Sending a single event to the collection endpoint
//! - Replaying a scripted session (page transitions, lifecycle and
//!   reachability signals) against the endpoint
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/eventbeacon/config.toml (~/.config/eventbeacon/config.toml)
//! - Logs: $XDG_STATE_HOME/eventbeacon/ (~/.local/state/eventbeacon/)

mod script;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventbeacon_core::{
    Beacon, Config, EventKind, Extra, LogSink, NewEvent, PageSession, StaticLocation,
};

use crate::script::Step;

#[derive(Parser)]
#[command(name = "eventbeacon")]
#[command(about = "Record telemetry events and deliver them to a collection endpoint")]
#[command(version)]
struct Args {
    /// Write logs to the XDG state directory
    #[arg(short, long)]
    verbose: bool,

    /// Config file to use instead of the XDG default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait for in-flight events before exiting
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show agent configuration and status
    Status,

    /// Record one event and deliver it
    Send {
        /// Event code
        #[arg(long)]
        code: String,

        /// Event name (default: the kind's display name for the code)
        #[arg(long)]
        name: Option<String>,

        /// Event kind (pageEnter, click, error, ...)
        #[arg(long, default_value = "click")]
        kind: EventKind,

        /// Page the event belongs to
        #[arg(long)]
        page: Option<String>,

        /// Extra attributes as a JSON object
        #[arg(long)]
        extra: Option<String>,

        /// Event time in epoch milliseconds (default: now)
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Replay a JSONL script of steps
    Replay {
        /// Script file
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = if args.verbose {
        Some(
            eventbeacon_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    let grace = Duration::from_secs(args.wait_secs);

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Send {
            code,
            name,
            kind,
            page,
            extra,
            timestamp,
        } => {
            let name = name.unwrap_or_else(|| kind.display_name(&code));
            let mut event = NewEvent::new(code, name, kind);
            event.timestamp_ms = timestamp;
            event.belonging_page = page;
            event.extra = extra.as_deref().map(parse_extra).transpose()?;
            cmd_send(&config, event, grace).await
        }
        Command::Replay { script } => {
            let steps = script::load(&script)?;
            cmd_replay(&config, &steps, grace).await
        }
    }
}

fn parse_extra(raw: &str) -> Result<Extra> {
    serde_json::from_str(raw).context("--extra must be a JSON object")
}

fn start_beacon(config: &Config) -> Result<Beacon> {
    config
        .agent
        .validate()
        .context("agent is not configured (run 'status' for details)")?;

    Beacon::builder(config.agent.clone())
        .resolver(Arc::new(StaticLocation::from(&config.location)))
        .sink(Arc::new(LogSink))
        .build()
        .context("failed to start event beacon")
}

fn cmd_status(config: &Config) -> Result<()> {
    let agent = &config.agent;

    println!("Event Beacon Configuration");
    println!("==========================");
    println!();
    println!(
        "Endpoint:        {}",
        if agent.endpoint.is_empty() {
            "<not set>"
        } else {
            agent.endpoint.as_str()
        }
    );
    println!("User ID:         {}", or_unset(&agent.user_id));
    println!("App Version:     {}", or_unset(&agent.app_version));
    println!("System Version:  {}", agent.system_version);
    println!("Environment:     {}", agent.environment().as_str());
    println!("Timeout:         {}s", agent.timeout_secs);
    println!("Log Level:       {}", config.logging.level);
    println!(
        "Log File:        {}",
        eventbeacon_core::logging::log_file_path().display()
    );

    println!();
    match agent.validate() {
        Ok(()) => println!("Status: Ready to send"),
        Err(e) => {
            println!("Status: Not ready ({})", e);
            println!();
            println!("Configure the agent in {}:", Config::config_path().display());
            println!();
            println!("  [agent]");
            println!("  endpoint = \"https://collector.example.com/events\"");
            println!("  user_id = \"your-user-id\"");
        }
    }

    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "<not set>"
    } else {
        value
    }
}

async fn cmd_send(config: &Config, event: NewEvent, grace: Duration) -> Result<()> {
    let beacon = start_beacon(config)?;

    println!("Sending {} ({})...", event.code, event.kind);
    beacon.record(event);
    finish(&beacon, grace).await;

    Ok(())
}

async fn cmd_replay(config: &Config, steps: &[Step], grace: Duration) -> Result<()> {
    let beacon = start_beacon(config)?;
    let mut snapshot = PageSession::default();

    println!("Replaying {} step(s)...", steps.len());

    for step in steps {
        tracing::debug!(?step, "Replaying step");
        match step {
            Step::Event { .. } => {
                if let Some(event) = step.to_event() {
                    beacon.record(event);
                }
            }
            Step::Lifecycle { signal } => beacon.on_lifecycle(*signal),
            Step::Snapshot => snapshot = beacon.current_page(),
            Step::ReturnToPage => beacon.return_to_page(&snapshot),
            Step::RotateSession => {
                let id = beacon.rotate_session_id();
                println!("  Session rotated: {}", id);
            }
            Step::Reachable => beacon.on_reachable(),
            Step::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        }

        // Keep script order observable at the endpoint
        beacon.flush().await;
    }

    finish(&beacon, grace).await;

    Ok(())
}

async fn finish(beacon: &Beacon, grace: Duration) {
    beacon.shutdown(grace).await;

    let stats = beacon.stats();
    println!();
    println!("Stats:");
    println!("  Recorded:   {}", stats.recorded);
    println!("  Sent:       {}", stats.sent);
    println!("  Queued:     {}", stats.queued);
    println!("  Retried:    {}", stats.retried);
    println!("  Dropped:    {}", stats.dropped);

    let pending = beacon.retry_snapshot();
    println!();
    println!("Pending retries: {}", pending.len());
    for record in pending {
        println!(
            "  {} {} ({}) at {}",
            record.kind.wire_code(),
            record.event_code,
            record.event_name,
            record.timestamp_ms
        );
    }
}

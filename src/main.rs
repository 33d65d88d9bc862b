//! Thin CLI entry point. The default (and implicit) behavior is to run one
//! collection-and-delivery pass; `status` and `reset` are operator-facing
//! diagnostics that never touch the network.

use clap::{Parser, Subcommand};

use claude_stats_agent::orchestrator::{self, Paths};
use claude_stats_agent::{config, logging, paths, state};

/// Client-side telemetry agent: harvests usage records from local session
/// logs and ships them to a configured aggregation server.
#[derive(Parser)]
#[command(name = "claude-stats-agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one collection-and-delivery pass (the default with no subcommand).
    Run,
    /// Print the current Scan State summary without mutating anything.
    Status,
    /// Delete the Scan State, Pending Buffer, and Lock files.
    Reset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run().await,
        Command::Status => status(),
        Command::Reset => reset(),
    }
}

async fn run() {
    let Some(agent_paths) = resolve_paths() else {
        // No resolvable $HOME: nothing this agent can do. Exit quietly.
        return;
    };
    let Some(config_path) = paths::config_path() else {
        return;
    };
    let settings = config::load(&config_path);
    orchestrator::run(agent_paths, settings).await;
}

fn status() {
    let Some(agent_paths) = resolve_paths() else {
        println!("claude-stats-agent: no resolvable $HOME, nothing to report");
        return;
    };
    let scan_state = state::load(&agent_paths.state);
    let buffer = claude_stats_agent::buffer::load(&agent_paths.buffer);

    println!("last run:        {}", format_epoch_ms(scan_state.last_run_timestamp));
    println!("tracked files:    {}", scan_state.file_offsets.len());
    println!("dedup days:       {}", scan_state.recent_hashes.0.len());
    println!("pending records:  {}", buffer.records.len());
}

fn reset() {
    let Some(agent_paths) = resolve_paths() else {
        return;
    };
    for path in [&agent_paths.state, &agent_paths.buffer, &agent_paths.lock] {
        match std::fs::remove_file(path) {
            Ok(()) => println!("removed {}", path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => eprintln!("could not remove {}: {err}", path.display()),
        }
    }
}

fn resolve_paths() -> Option<Paths> {
    Some(Paths {
        state: paths::state_path()?,
        buffer: paths::buffer_path()?,
        lock: paths::lock_path()?,
        log_roots: paths::log_roots(),
    })
}

fn format_epoch_ms(ms: i64) -> String {
    if ms == 0 {
        return "never".to_string();
    }
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.to_rfc3339(),
        None => "invalid timestamp".to_string(),
    }
}

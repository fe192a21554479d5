//! UNIVERSE host binary: wires the engine, the store, and the
//! line-delimited JSON protocol onto stdin/stdout.
//!
//! Logging goes to stderr so stdout carries only protocol lines.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use universe_core::Engine;
use universe_pipe::Session;
use universe_store::{MemStore, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "universe", about = "Deterministic self-replicating probe galaxy simulator")]
struct Cli {
    /// Universe seed. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Tick budget for headless runs; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Run without any display surface (default).
    #[arg(long, conflicts_with = "visual")]
    headless: bool,

    /// Expect an external renderer driving the pipe protocol.
    #[arg(long)]
    visual: bool,

    /// Serve the line-delimited JSON command protocol on stdin/stdout.
    #[arg(long)]
    pipe: bool,

    /// SQLite database path; in-memory persistence when omitted.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Autosave every N ticks in headless mode; 0 disables.
    #[arg(long, default_value_t = 0)]
    save_interval: u64,

    /// Resume from the saved universe in --db before starting.
    #[arg(long)]
    resume: bool,

    /// Convenience tick budget in simulated years (365 ticks each).
    #[arg(long, conflicts_with = "ticks")]
    sim_years: Option<u64>,

    /// Wall-clock budget for headless runs, in hours; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    hours: u64,
}

fn open_store(db: Option<&PathBuf>) -> Result<Box<dyn Store>> {
    match db {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("opening database {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(MemStore::default())),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(rand::random);
    let store = open_store(cli.db.as_ref())?;

    let mut session = Session::new(Engine::new(seed), store);
    if cli.resume {
        let response = session.handle_line(r#"{"cmd":"load"}"#);
        let parsed: serde_json::Value =
            serde_json::from_str(&response).context("parsing load response")?;
        anyhow::ensure!(
            parsed["ok"] == true,
            "resume failed: {}",
            parsed["error"].as_str().unwrap_or("unknown")
        );
        tracing::info!(tick = session.engine.universe.tick, "resumed saved universe");
    }

    // Visual mode hands the protocol to an external renderer; headless
    // self-drives unless a pipe was requested explicitly.
    if (cli.pipe || cli.visual) && !cli.headless {
        run_pipe(&mut session)
    } else {
        let ticks = cli.sim_years.map_or(cli.ticks, |years| years * 365);
        run_headless(&mut session, ticks, cli.save_interval, cli.hours)
    }
}

/// Blocking REPL: one request line in, one response line out, until quit
/// or EOF.
fn run_pipe(session: &mut Session) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{}", session.ready_banner()).context("writing ready banner")?;
    out.flush().context("flushing ready banner")?;

    for line in stdin.lock().lines() {
        let line = line.context("reading command line")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = session.handle_line(&line);
        writeln!(out, "{response}").context("writing response")?;
        out.flush().context("flushing response")?;
        if !session.running() {
            break;
        }
    }
    tracing::info!(tick = session.engine.universe.tick, "pipe session ended");
    Ok(())
}

/// Self-driving run: every probe waits, the clock advances, autosaves land
/// on the configured cadence.
fn run_headless(
    session: &mut Session,
    ticks: u64,
    save_interval: u64,
    hours: u64,
) -> Result<()> {
    let deadline = (hours > 0).then(|| Instant::now() + Duration::from_secs(hours * 3600));
    let actions = BTreeMap::new();
    let mut executed: u64 = 0;

    tracing::info!(
        seed = session.engine.universe.seed,
        ticks,
        "starting headless run"
    );

    loop {
        if ticks > 0 && executed >= ticks {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                tracing::info!("wall-clock budget exhausted");
                break;
            }
        }

        let report = session.engine.step(&actions);
        executed += 1;

        if save_interval > 0 && report.tick % save_interval == 0 {
            let response = session.handle_line(r#"{"cmd":"save"}"#);
            let parsed: serde_json::Value =
                serde_json::from_str(&response).context("parsing save response")?;
            anyhow::ensure!(
                parsed["ok"] == true,
                "autosave failed: {}",
                parsed["error"].as_str().unwrap_or("unknown")
            );
            tracing::debug!(tick = report.tick, "autosaved");
        }
        if report.tick % 1_000 == 0 {
            let metrics = session.engine.compute_metrics();
            tracing::info!(
                tick = report.tick,
                probes = metrics.probes_spawned,
                explored = metrics.systems_explored,
                "progress"
            );
        }
        if ticks == 0 && deadline.is_none() {
            // Unlimited and unbounded would spin forever in a process with
            // no driver; bail out after a sane default horizon.
            if executed >= 100 * 365 {
                tracing::info!("default horizon reached");
                break;
            }
        }
    }

    let metrics = session.engine.compute_metrics();
    tracing::info!(
        tick = session.engine.universe.tick,
        probes = metrics.probes_spawned,
        explored = metrics.systems_explored,
        events = metrics.event_counts.iter().sum::<u64>(),
        "headless run complete"
    );
    Ok(())
}

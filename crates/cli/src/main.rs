//! MergeMark command-line conflict tool.
//!
//! Provides subcommands for listing the conflict regions in a file,
//! resolving a region in place, and watching a file for repository-driven
//! conflict state changes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mergemark_core::config::MarkerStyle;
use mergemark_core::engine::Engine;
use mergemark_core::host::{self, BufferId, Host, MemoryHost};
use mergemark_core::marker::{self, MarkerMatchers};
use mergemark_core::{EngineConfig, ResolutionKind};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// MergeMark command-line conflict tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergemark",
    version,
    about = "Detect, inspect, and resolve merge-conflict markers in text files"
)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the conflict regions in a file.
    Scan {
        /// File to scan.
        file: PathBuf,
    },

    /// Resolve the conflict region covering a line, editing the file in
    /// place.
    Resolve {
        /// File to edit.
        file: PathBuf,

        /// A line number inside the region to resolve (1-based).
        #[arg(short, long)]
        line: usize,

        /// Resolution: current, incoming, both, or none.
        #[arg(long)]
        accept: String,
    },

    /// Track a file and report conflict state changes until interrupted.
    Watch {
        /// File to watch.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Minimal logging for CLI; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).context("failed to load configuration file")?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Scan { file } => cmd_scan(&config, &file),
        Commands::Resolve { file, line, accept } => {
            cmd_resolve(config, &file, line, &accept).await
        }
        Commands::Watch { file } => cmd_watch(config, &file).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn matchers_for(config: &EngineConfig) -> MarkerMatchers {
    match config.marker_style {
        MarkerStyle::Tolerant => MarkerMatchers::tolerant(),
        MarkerStyle::Exact => MarkerMatchers::exact(),
    }
}

fn read_lines(file: &PathBuf) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    // An empty file is one empty line, as in an editor buffer.
    if lines.is_empty() {
        lines.push(String::new());
    }
    Ok(lines)
}

fn cmd_scan(config: &EngineConfig, file: &PathBuf) -> Result<()> {
    let lines = read_lines(file)?;
    let regions = marker::parse_regions(&lines, &matchers_for(config));

    if regions.is_empty() {
        println!("No conflict regions found.");
        return Ok(());
    }

    println!(
        "{:<8} {:<8} {:<8} {:<20} {:<20}",
        "START", "DELIM", "END", "CURRENT", "INCOMING"
    );
    println!("{}", "-".repeat(66));

    for r in &regions {
        println!(
            "{:<8} {:<8} {:<8} {:<20} {:<20}",
            r.start_line,
            r.delimiter_line,
            r.end_line,
            r.current_label.as_deref().unwrap_or("-"),
            r.incoming_label.as_deref().unwrap_or("-"),
        );
    }

    println!();
    println!("{} conflict region(s)", regions.len());
    Ok(())
}

async fn cmd_resolve(config: EngineConfig, file: &PathBuf, line: usize, accept: &str) -> Result<()> {
    let kind = match accept {
        "current" => ResolutionKind::Current,
        "incoming" => ResolutionKind::Incoming,
        "both" => ResolutionKind::Both,
        "none" => ResolutionKind::Reject,
        other => {
            anyhow::bail!(
                "invalid resolution '{}': use 'current', 'incoming', 'both', or 'none'",
                other
            );
        }
    };

    let debounce = config.debounce_ms;
    let mut host = MemoryHost::new();
    let buf = host::load_file(&mut host, file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut engine = Engine::new(host, config);

    engine.track(buf);
    settle(&mut engine, debounce).await;

    let before = engine.positions(buf);
    if !before.iter().any(|p| p.contains(line)) {
        anyhow::bail!("no conflict region covers line {}", line);
    }

    engine.host_mut().set_cursor(buf, line);
    engine.resolve(buf, kind);
    settle(&mut engine, debounce).await;

    let resolved = engine
        .host()
        .lines(buf)
        .context("buffer disappeared during resolution")?;
    let mut text = resolved.join("\n");
    text.push('\n');
    std::fs::write(file, text).with_context(|| format!("failed to write {}", file.display()))?;

    println!(
        "Resolved (accepted {}); {} conflict region(s) remain",
        accept,
        engine.positions(buf).len()
    );
    Ok(())
}

async fn cmd_watch(config: EngineConfig, file: &PathBuf) -> Result<()> {
    let debounce = config.debounce_ms;
    let mut host = MemoryHost::new();
    let buf = host::load_file(&mut host, file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut engine = Engine::new(host, config);

    engine.track(buf);
    settle(&mut engine, debounce).await;
    report(&engine, buf, file);

    debug!(file = %file.display(), "watch started");
    println!("Watching {} (ctrl-c to stop)...", file.display());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                // Pick up on-disk edits alongside repository state changes.
                // `read_lines` never yields an empty buffer, so the full-span
                // replacement below always has a valid range to target.
                if let Ok(lines) = read_lines(file) {
                    let changed = engine.host().lines(buf).map(|l| l != lines).unwrap_or(true);
                    if changed {
                        debug!(file = %file.display(), lines = lines.len(), "picked up external edit");
                        let last = engine.host().lines(buf).map(|l| l.len()).unwrap_or(1);
                        engine.host_mut().replace_lines(buf, 1, last, lines);
                        engine.on_edit(buf);
                    }
                }
                settle(&mut engine, debounce).await;
                if !engine.host_mut().take_repaints().is_empty() {
                    report(&engine, buf, file);
                }
            }
        }
    }

    engine.untrack(buf);
    println!("Stopped.");
    Ok(())
}

fn report(engine: &Engine<MemoryHost>, buf: BufferId, file: &PathBuf) {
    let positions = engine.positions(buf);
    if positions.is_empty() {
        println!("{}: no conflicts", file.display());
    } else {
        let spans: Vec<String> = positions
            .iter()
            .map(|p| format!("{}-{}", p.current_line, p.incoming_line))
            .collect();
        println!(
            "{}: {} conflict(s) at lines {}",
            file.display(),
            positions.len(),
            spans.join(", ")
        );
    }
}

/// Wait out the debounce window, then drain the engine's event queue.
async fn settle(engine: &mut Engine<MemoryHost>, debounce_ms: u64) {
    tokio::time::sleep(Duration::from_millis(debounce_ms + 30)).await;
    engine.pump();
}

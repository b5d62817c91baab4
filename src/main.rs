use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memgoal::trace::{parse_trace, write_report, TraceReplay};
use memgoal::ProbeConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memgoal", about = "Check method-level heap growth against byte limits")]
struct Cli {
    /// Log probe activity at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an event trace through a scripted host and evaluate its checks.
    Replay {
        /// Trace file (one directive per line).
        trace: PathBuf,
        /// Byte limit for `check` lines that do not name one.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        max_growth: i64,
        /// Collect peak growth and activation counts.
        #[arg(long)]
        profile: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Replay {
            trace,
            max_growth,
            profile,
        } => run_replay(trace, max_growth, profile),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "memgoal=debug" } else { "memgoal=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_replay(trace_path: PathBuf, max_growth: i64, profile: bool) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&trace_path)
        .with_context(|| format!("failed to read trace {}", trace_path.display()))?;
    let lines = parse_trace(&text)
        .with_context(|| format!("failed to parse trace {}", trace_path.display()))?;

    let config = ProbeConfig::default()
        .with_max_growth(max_growth)
        .with_growth_profiling(profile);
    let mut replay = TraceReplay::new(config);
    let report = replay.run(&lines).context("trace replay failed")?;

    if report.checks.is_empty() {
        println!("No checks in trace.");
        return Ok(ExitCode::SUCCESS);
    }

    write_report(&mut io::stdout().lock(), &report)?;

    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::info!(failures = report.failures(), "memory goals failed");
        Ok(ExitCode::FAILURE)
    }
}

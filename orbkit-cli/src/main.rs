//! orbkit CLI: configuration check and JSON-lines replay.
//!
//! Commands:
//! - `check`: validate a TOML engine config, print its hash and strategy
//! - `replay`: feed tagged bar/outcome events through one engine and print
//!   one JSON decision per bar to stdout

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use orbkit_core::domain::Bar;
use orbkit_core::{
    BucketKey, Decision, EngineConfig, EngineError, EvEstimator, MarketContext, Outcome,
    StrategyEngine,
};

#[derive(Parser)]
#[command(
    name = "orbkit",
    about = "orbkit CLI: opening-range breakout signal pipeline"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print its hash.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Replay a JSON-lines event stream through the engine.
    Replay {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines input, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: PathBuf,

        /// Stop at the first void or malformed bar instead of skipping it.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

/// One line of replay input.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayEvent {
    Bar {
        bar: Bar,
        #[serde(default)]
        context: MarketContext,
    },
    Outcome {
        bucket: BucketKey,
        win: bool,
    },
}

/// One line of replay output.
#[derive(Serialize)]
struct ReplayLine<'a> {
    bar_index: usize,
    timestamp: String,
    #[serde(flatten)]
    decision: &'a Decision,
}

#[derive(Default)]
struct ReplaySummary {
    bars: usize,
    skipped_bars: usize,
    outcomes: usize,
    orders: usize,
    rejections: BTreeMap<&'static str, usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { config } => run_check(&config),
        Commands::Replay {
            config,
            input,
            strict,
        } => run_replay(config.as_deref(), &input, strict),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn run_check(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let engine = StrategyEngine::new(config).context("Config rejected by engine")?;
    println!("strategy: {}", engine.strategy_name());
    println!("symbol:   {}", engine.config().symbol);
    println!("hash:     {}", engine.config_hash());
    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn run_replay(config: Option<&Path>, input: &Path, strict: bool) -> Result<()> {
    let config = load_config(config)?;
    let mut ev = EvEstimator::new(&config.ev);
    let mut engine = StrategyEngine::new(config).context("Config rejected by engine")?;

    let reader = open_input(input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut summary = ReplaySummary::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: ReplayEvent = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event on line {}", line_no + 1))?;

        match event {
            ReplayEvent::Outcome { bucket, win } => {
                ev.update(Outcome::from_win(win), &bucket);
                summary.outcomes += 1;
            }
            ReplayEvent::Bar { bar, context } => {
                summary.bars += 1;
                match engine.on_bar(&bar) {
                    Ok(_) => {}
                    Err(EngineError::VoidBar { bar_index })
                    | Err(EngineError::MalformedBar { bar_index })
                        if !strict =>
                    {
                        summary.skipped_bars += 1;
                        tracing::warn!(line = line_no + 1, bar_index, "skipping unusable bar");
                        continue;
                    }
                    Err(e) => bail!("line {}: {e}", line_no + 1),
                }

                let decision = engine
                    .evaluate(&context, &ev)
                    .with_context(|| format!("Evaluation failed on line {}", line_no + 1))?;
                match &decision {
                    Decision::Order(_) => summary.orders += 1,
                    Decision::Rejected(reason) => {
                        *summary.rejections.entry(reason.stage()).or_default() += 1
                    }
                    Decision::NoSetup => {}
                }

                let record = ReplayLine {
                    bar_index: engine.state().bar_index(),
                    timestamp: bar.timestamp.to_rfc3339(),
                    decision: &decision,
                };
                serde_json::to_writer(&mut out, &record)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;

    tracing::info!(
        bars = summary.bars,
        skipped_bars = summary.skipped_bars,
        outcomes = summary.outcomes,
        orders = summary.orders,
        rejections = ?summary.rejections,
        "replay finished"
    );
    Ok(())
}

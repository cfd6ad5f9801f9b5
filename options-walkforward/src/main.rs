//! Walk-forward options backtester CLI.
//!
//! # Usage
//!
//! ```bash
//! # Run a walk-forward backtest on daily bars in data/bars/SPY.parquet
//! options-walkforward run --symbol SPY --start 2022-01-01 --end 2023-12-31
//!
//! # Override windows and trade limits, write JSON results
//! options-walkforward run --symbol SPY --start 2022-01-01 --end 2023-12-31 \
//!     --config config/walkforward.json --min-confidence 0.5 --output results/spy.json
//!
//! # Check bar files before running
//! options-walkforward validate --symbols SPY,QQQ,IWM
//! options-walkforward validate
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use tracing::warn;

use options_walkforward::data::{BarProvider, ParquetBarLoader};
use options_walkforward::validation::BarIntegrityValidator;
use options_walkforward::walkforward::{WalkForwardConfig, WalkForwardRunner};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "options-walkforward")]
#[command(about = "Walk-forward backtesting for a signal-driven options strategy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (bars are read from <data-dir>/bars/<SYMBOL>.parquet)
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a walk-forward backtest
    Run {
        /// Underlying symbol
        #[arg(long)]
        symbol: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write JSON results to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Training window in calendar days
        #[arg(long)]
        training_days: Option<i64>,

        /// Test window in calendar days
        #[arg(long)]
        testing_days: Option<i64>,

        /// Minimum combined confidence for an entry
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Maximum capital per trade
        #[arg(long)]
        max_investment: Option<Decimal>,

        /// Evaluate periods in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Validate bar files
    Validate {
        /// Comma-separated list of symbols (default: every file under bars/)
        #[arg(long)]
        symbols: Option<String>,
    },
}

fn parse_date(value: &str, label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format: {}", label, value))
}

fn load_config(path: Option<&PathBuf>) -> Result<WalkForwardConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        }
        None => Ok(WalkForwardConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    data_dir: PathBuf,
    symbol: String,
    start: String,
    end: String,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    training_days: Option<i64>,
    testing_days: Option<i64>,
    min_confidence: Option<f64>,
    max_investment: Option<Decimal>,
    parallel: bool,
) -> Result<()> {
    let start_date = parse_date(&start, "start")?;
    let end_date = parse_date(&end, "end")?;

    let mut config = load_config(config.as_ref())?;
    if let Some(days) = training_days {
        config.training_days = days;
    }
    if let Some(days) = testing_days {
        config.testing_days = days;
    }
    if let Some(confidence) = min_confidence {
        config.trading.min_confidence = confidence;
    }
    if let Some(amount) = max_investment {
        config.trading.max_investment = amount;
    }
    config.parallel |= parallel;

    if config.trading.min_confidence > config.signals.max_confidence() {
        warn!(
            "min_confidence {:.2} exceeds the highest reachable confidence {:.2}; no trades will be entered",
            config.trading.min_confidence,
            config.signals.max_confidence()
        );
    }

    let data_str = data_dir.to_string_lossy().to_string();
    let runner = WalkForwardRunner::new(ParquetBarLoader::new(&data_str), config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.set_message(format!("Walk-forward {} {} to {}", symbol, start_date, end_date));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let results = runner.run(&symbol, start_date, end_date);
    spinner.finish_and_clear();
    let results = results.with_context(|| format!("Walk-forward run failed for {}", symbol))?;

    println!("{}", SEPARATOR);
    println!("{}", results.summary());
    println!("{}", SEPARATOR);

    if let Some(path) = output {
        results
            .save(&path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        println!("Results written to {}", path.display());
    }

    Ok(())
}

fn cmd_validate(data_dir: PathBuf, symbols: Option<String>) -> Result<()> {
    let loader = ParquetBarLoader::new(&data_dir.to_string_lossy());
    let symbol_list: Vec<String> = match symbols {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => loader
            .available_symbols()
            .context("Failed to list bar files")?,
    };
    if symbol_list.is_empty() {
        bail!("No bar files found under {}", data_dir.display());
    }

    let mut failures = 0;
    for symbol in &symbol_list {
        let bars = loader
            .fetch_bars(symbol, NaiveDate::MIN, NaiveDate::MAX)
            .with_context(|| format!("Failed to load bars for {}", symbol))?;
        let report = BarIntegrityValidator::validate(symbol, &bars);

        println!("{}", report.summary());
        for check in report.failed_checks() {
            failures += 1;
            println!("  FAIL {}: {}", check.name, check.message);
            if let Some(details) = &check.details {
                println!("       {}", details);
            }
        }
    }

    if failures > 0 {
        bail!("{} bar checks failed", failures);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("options_walkforward=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            symbol,
            start,
            end,
            config,
            output,
            training_days,
            testing_days,
            min_confidence,
            max_investment,
            parallel,
        } => cmd_run(
            cli.data_dir,
            symbol,
            start,
            end,
            config,
            output,
            training_days,
            testing_days,
            min_confidence,
            max_investment,
            parallel,
        )?,
        Commands::Validate { symbols } => cmd_validate(cli.data_dir, symbols)?,
    }

    Ok(())
}

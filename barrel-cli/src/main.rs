//! BARREL CLI: screen and universe commands.
//!
//! Commands:
//! - `screen`: run one screening pass and print the result table
//! - `universe`: print the active ticker universe as TOML

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use barrel_core::data::{CircuitBreaker, CsvProvider, YahooProvider};
use barrel_core::{ForecastEngine, MarketDataProvider};
use barrel_runner::export::{write_csv, write_json};
use barrel_runner::{format_summary, format_table, ScreenOptions, Screener, ScreenerConfig};

#[derive(Parser)]
#[command(
    name = "barrel",
    about = "BARREL: ARMA screener over a fixed ticker universe"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one screening pass and print the result table.
    Screen {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Historical window in trading days: 120, 360 or 720.
        #[arg(long)]
        window: Option<usize>,

        /// Forecast horizon in trading days: 30, 60 or 120.
        #[arg(long)]
        horizon: Option<usize>,

        /// Maximum tickers processed concurrently.
        #[arg(long)]
        workers: Option<usize>,

        /// Read `<DIR>/<SYMBOL>.csv` files instead of querying Yahoo Finance.
        #[arg(long)]
        offline_dir: Option<PathBuf>,

        /// Last day of the requested history (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Also write the rows as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Also write the rows as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the active ticker universe as TOML.
    Universe {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Screen {
            config,
            window,
            horizon,
            workers,
            offline_dir,
            as_of,
            csv,
            json,
        } => run_screen(ScreenArgs {
            config,
            window,
            horizon,
            workers,
            offline_dir,
            as_of,
            csv,
            json,
        }),
        Commands::Universe { config } => run_universe(config.as_deref()),
    }
}

/// Logs go to stderr so the table on stdout stays clean.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct ScreenArgs {
    config: Option<PathBuf>,
    window: Option<usize>,
    horizon: Option<usize>,
    workers: Option<usize>,
    offline_dir: Option<PathBuf>,
    as_of: Option<String>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<ScreenerConfig> {
    match path {
        Some(path) => ScreenerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ScreenerConfig::default()),
    }
}

fn run_screen(args: ScreenArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(window) = args.window {
        config.screen.historical_window = window;
    }
    if let Some(horizon) = args.horizon {
        config.screen.forecast_horizon = horizon;
    }
    if let Some(workers) = args.workers {
        config.pool.workers = workers;
    }
    config.validate().context("invalid screen configuration")?;

    let as_of = args
        .as_of
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--as-of must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let provider: Arc<dyn MarketDataProvider> = match &args.offline_dir {
        Some(dir) => Arc::new(CsvProvider::new(dir)),
        None => Arc::new(
            YahooProvider::new(
                Arc::new(CircuitBreaker::default_provider()),
                config.yahoo_settings(),
            )
            .context("failed to set up Yahoo Finance provider")?,
        ),
    };

    let engine =
        ForecastEngine::new(config.forecast_config()).context("invalid model configuration")?;
    let options = ScreenOptions {
        workers: config.pool.workers,
        ticker_timeout: config.ticker_timeout(),
        lookback_years: config.fetch.lookback_years,
        as_of,
    };

    let universe = config.universe();
    let request = config.screen_request(1)?;
    let report = Screener::new(provider, engine, options).run(&universe, &request);

    let summary = format_summary(&report);
    let rows = report.into_rows();
    print!("{}", format_table(&rows));
    println!();
    print!("{summary}");

    if let Some(path) = &args.csv {
        write_csv(path, &rows)?;
        tracing::info!(path = %path.display(), "wrote CSV");
    }
    if let Some(path) = &args.json {
        write_json(path, &rows)?;
        tracing::info!(path = %path.display(), "wrote JSON");
    }
    Ok(())
}

fn run_universe(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let text = config
        .universe()
        .to_toml()
        .context("failed to render universe")?;
    print!("{text}");
    Ok(())
}

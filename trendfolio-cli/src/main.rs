//! Trendfolio CLI — signal runs and data utilities.
//!
//! Commands:
//! - `signals`: step the engine once against a data directory and print orders
//! - `profiles`: print the built-in risk profiles as TOML
//! - `universe`: list the default universe of a data directory with sectors
//! - `synth`: write a deterministic synthetic data directory

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trendfolio_core::data::UNKNOWN_SECTOR;
use trendfolio_core::engine::RebalanceOutcome;
use trendfolio_core::position_management::BreakerDecision;
use trendfolio_core::settings::EngineSettings;
use trendfolio_runner::store::{discover, read_sector};
use trendfolio_runner::{presets_toml, run_signals, write_synthetic_dir, RunConfig, SignalReport};

#[derive(Parser)]
#[command(
    name = "trendfolio",
    about = "Trendfolio CLI — regime-aware trend-following portfolio signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trading iteration and print the resulting orders.
    Signals {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Defaults to the last bar in the data directory.
        #[arg(long)]
        date: Option<String>,

        /// Print the full report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the built-in profiles as TOML.
    Profiles,
    /// List the default universe of a data directory.
    Universe {
        /// Directory of per-ticker CSV files.
        #[arg(long)]
        data_dir: PathBuf,

        /// Maximum number of tickers. Defaults to the engine's universe limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write synthetic per-ticker CSV files for demos.
    Synth {
        /// Output directory.
        #[arg(long)]
        dir: PathBuf,

        /// Tickers to generate (e.g., SPY AAPL MSFT).
        #[arg(long, num_args = 1.., required = true)]
        symbols: Vec<String>,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2022-01-03")]
        start: String,

        /// Last date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Signals { config, date, json } => run_signals_cmd(&config, date.as_deref(), json),
        Commands::Profiles => {
            print!("{}", presets_toml()?);
            Ok(())
        }
        Commands::Universe { data_dir, limit } => run_universe(&data_dir, limit),
        Commands::Synth {
            dir,
            symbols,
            start,
            end,
        } => run_synth(&dir, &symbols, &start, end.as_deref()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_signals_cmd(config_path: &Path, date: Option<&str>, json: bool) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;
    let as_of = date.map(parse_date).transpose()?;

    let report = run_signals(&config, as_of)?;
    tracing::info!(
        as_of = %report.as_of,
        orders = report.orders.len(),
        "signal run complete"
    );

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_universe(data_dir: &Path, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or_else(|| EngineSettings::default().max_universe);
    let files = discover(data_dir)?;
    if files.is_empty() {
        bail!("no ticker files in {}", data_dir.display());
    }

    println!("{:<8} {}", "Ticker", "Sector");
    println!("{}", "-".repeat(30));
    for (ticker, path) in files.iter().take(limit) {
        let sector = match read_sector(path) {
            Ok(sector) => sector.unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
            Err(e) => {
                tracing::warn!(%ticker, error = %e, "unreadable ticker file");
                UNKNOWN_SECTOR.to_string()
            }
        };
        println!("{ticker:<8} {sector}");
    }
    println!();
    println!("{} of {} tickers", files.len().min(limit), files.len());
    Ok(())
}

fn run_synth(dir: &Path, symbols: &[String], start: &str, end: Option<&str>) -> Result<()> {
    let start = parse_date(start)?;
    let end = match end {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    if end < start {
        bail!("end date {end} is before start date {start}");
    }

    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let written = write_synthetic_dir(dir, &refs, start, end)?;
    println!("Wrote {written} ticker file(s) to {}", dir.display());
    Ok(())
}

fn print_summary(report: &SignalReport) {
    println!();
    println!("=== Signals {} ===", report.as_of);
    println!("Run:            {}", report.run_id);
    println!(
        "Profile:        {} ({})",
        report.profile, report.profile_fingerprint
    );
    println!("Universe:       {} symbols", report.universe_size);
    println!("Portfolio:      {:.2}", report.portfolio_value);
    println!("Cash:           {:.2}", report.cash);

    match &report.breaker {
        BreakerDecision::Tripped {
            drawdown,
            cooldown_until,
        } => println!(
            "Breaker:        TRIPPED at {:.1}% drawdown, cooling down until {cooldown_until}",
            drawdown * 100.0
        ),
        BreakerDecision::Within { drawdown } => {
            println!("Breaker:        {:.1}% below peak", drawdown * 100.0)
        }
        BreakerDecision::Initialized | BreakerDecision::NewPeak => {
            println!("Breaker:        at peak")
        }
    }
    if report.in_cooldown {
        println!("Cooldown:       active, no rebalance");
    } else if !report.rebalance_due {
        println!("Rebalance:      not due");
    }

    if let Some(regime) = &report.regime {
        let breadth = regime
            .breadth
            .map(|b| format!("{:.0}%", b * 100.0))
            .unwrap_or_else(|| "n/a".into());
        println!(
            "Regime:         {:?} (breadth {breadth}, exposure {:.0}%)",
            regime.regime,
            regime.exposure * 100.0
        );
    }

    match &report.outcome {
        Some(RebalanceOutcome::Rebalanced {
            held,
            invested_fraction,
        }) => println!(
            "Rebalance:      {held} held, {:.1}% invested",
            invested_fraction * 100.0
        ),
        Some(RebalanceOutcome::HoldCash) => println!("Rebalance:      no affordable targets, holding cash"),
        Some(RebalanceOutcome::NoneSelected) => println!("Rebalance:      nothing selected, holding"),
        None => {}
    }

    if report.rebalance_due && !report.in_cooldown {
        println!("Ranked:         {}", report.ranked_count);
        println!("Selected:       {}", report.selected.join(", "));
    }

    if !report.targets.is_empty() {
        println!();
        println!(
            "{:<8} {:>8} {:>10} {:>8} {:>10} {:>10}",
            "Symbol", "Shares", "Price", "Weight", "Stop", "Risk $"
        );
        println!("{}", "-".repeat(59));
        for t in &report.targets {
            println!(
                "{:<8} {:>8} {:>10.2} {:>7.1}% {:>10.2} {:>10.2}",
                t.symbol,
                t.shares,
                t.price,
                t.weight * 100.0,
                t.stop_distance,
                t.risk_dollars
            );
        }
    }

    println!();
    if report.orders.is_empty() {
        println!("No orders.");
    } else {
        println!("Orders:");
        for order in &report.orders {
            println!("  {order} ({:?})", order.reason);
        }
    }
    println!();
}

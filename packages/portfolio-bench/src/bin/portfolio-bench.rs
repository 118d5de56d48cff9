//! portfolio-bench CLI - trade-ledger P&L against a benchmark.
//!
//! JSON output is wrapped in an `ApiResponse` envelope; logs go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use portfolio_bench::{
    load_ledger, report, Analysis, AnalysisConfig, AnalysisReport, ApiResponse,
    CsvPriceDirectory, Error,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "portfolio-bench")]
#[command(about = "Compare a trade ledger's P&L with a benchmark")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a ledger and compute P&L and benchmark statistics
    Analyze {
        /// Trade ledger CSV (Date,Ticker,Amount,Price)
        #[arg(short, long)]
        ledger: PathBuf,
        /// Directory of <TICKER>.csv closing-price files
        #[arg(short, long)]
        prices: PathBuf,
        /// Config file (defaults to $PORTFOLIO_BENCH_CONFIG or ~/.portfolio-bench/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Date the risk-free return is compounded to (defaults to today)
        #[arg(short, long)]
        evaluation_date: Option<NaiveDate>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Also write the daily series as CSV to this path
        #[arg(long)]
        series_out: Option<PathBuf>,
    },
    /// Show the resolved configuration
    Config {
        /// Config file to read instead of the default
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (output, success) = match cli.command {
        Commands::Analyze {
            ledger,
            prices,
            config,
            evaluation_date,
            format,
            series_out,
        } => handle_analyze(ledger, prices, config, evaluation_date, format, series_out),
        Commands::Config { path } => handle_config(path),
    };

    println!("{}", output);
    if !success {
        std::process::exit(1);
    }
}

fn to_json<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!("{{\"ok\":false,\"error\":\"{}\"}}", e))
}

fn failure(error: &Error, format: OutputFormat) -> (String, bool) {
    error!(kind = ?error.kind(), "{}", error);
    let output = match format {
        OutputFormat::Json => to_json(&ApiResponse::<()>::from_error(error)),
        OutputFormat::Text => format!("error: {}", error),
    };
    (output, false)
}

fn run_analysis(
    ledger: PathBuf,
    prices: PathBuf,
    config: Option<PathBuf>,
    evaluation_date: Option<NaiveDate>,
    series_out: Option<PathBuf>,
) -> portfolio_bench::Result<AnalysisReport> {
    let config_path = config.unwrap_or_else(AnalysisConfig::default_path);
    let config = AnalysisConfig::load(&config_path)?;
    let ledger = load_ledger(&ledger)?;
    let source = CsvPriceDirectory::new(prices);
    let evaluation_date = evaluation_date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let analysis = Analysis::new(config, ledger)?;
    info!(
        benchmark = %analysis.config().benchmark_ticker,
        trades = analysis.ledger().len(),
        first_trade = %analysis.ledger().start_date(),
        evaluation_date = %evaluation_date,
        "running analysis"
    );
    let result = analysis.run(&source, evaluation_date)?;

    if let Some(path) = series_out {
        report::write_series_csv(&path, &result)?;
        info!(path = %path.display(), "series written");
    }
    Ok(result)
}

fn handle_analyze(
    ledger: PathBuf,
    prices: PathBuf,
    config: Option<PathBuf>,
    evaluation_date: Option<NaiveDate>,
    format: OutputFormat,
    series_out: Option<PathBuf>,
) -> (String, bool) {
    match run_analysis(ledger, prices, config, evaluation_date, series_out) {
        Ok(result) => {
            let output = match format {
                OutputFormat::Json => to_json(&ApiResponse::ok(&result)),
                OutputFormat::Text => report::render_text(&result),
            };
            (output, true)
        }
        Err(e) => failure(&e, format),
    }
}

fn handle_config(path: Option<PathBuf>) -> (String, bool) {
    let path = path.unwrap_or_else(AnalysisConfig::default_path);
    match AnalysisConfig::load(&path) {
        Ok(config) => {
            debug!(path = %path.display(), "configuration loaded");
            (to_json(&ApiResponse::ok(&config)), true)
        }
        Err(e) => failure(&e, OutputFormat::Json),
    }
}

//! Portfolio Bench - Trade-ledger P&L attribution against a benchmark.
//!
//! This crate replays a chronological ledger of buy/sell trades over a daily
//! price grid and compares the resulting portfolio return with a benchmark:
//!
//! - **Position tracking**: Average-cost basis per instrument, forward-filled per day
//! - **P&L aggregation**: Unrealized, realized and total P&L as % of initial investment
//! - **Benchmark statistics**: Correlation, beta, alpha and range statistics
//! - **Collaborators**: TOML configuration, CSV ledger and CSV price directories
//!
//! # Example
//!
//! ```rust,no_run
//! use portfolio_bench::{load_ledger, Analysis, AnalysisConfig, CsvPriceDirectory};
//! use std::path::Path;
//!
//! let config = AnalysisConfig::load(&AnalysisConfig::default_path())?;
//! let ledger = load_ledger(Path::new("Portfolio.csv"))?;
//! let prices = CsvPriceDirectory::new("prices");
//!
//! let today = chrono::Local::now().date_naive();
//! let report = Analysis::new(config, ledger)?.run(&prices, today)?;
//! println!("alpha = {:.3}%", report.statistics.alpha);
//! # Ok::<(), portfolio_bench::Error>(())
//! ```

pub mod analysis;
pub mod config;
pub mod ledger;
pub mod portfolio;
pub mod prices;
pub mod report;
pub mod types;

use chrono::NaiveDate;

// Re-export commonly used types
pub use types::{
    ApiResponse, PriceSeries, Series, SeriesPoint, SummaryStatistics, Trade, TradeLedger,
    TradeSide,
};

// Re-export main functionality
pub use analysis::{analyze, Analysis, AnalysisReport};
pub use config::AnalysisConfig;
pub use ledger::{load_ledger, read_ledger};
pub use portfolio::{
    aggregate_pnl, business_days_between, calculate_statistics, normalize_benchmark,
    pearson_correlation, population_std, risk_free_adjusted, InstrumentPosition, PnlSeries,
    PositionTable, PositionTracker, POSITION_EPSILON,
};
pub use prices::{CsvPriceDirectory, InMemoryPrices, PriceSource};

/// Error types for portfolio-bench operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Statistical degeneracy: {0}")]
    StatisticalDegeneracy(String),
}

impl Error {
    /// Classify the error for display by the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Json(_) => ErrorKind::Io,
            Error::Csv(e) if e.is_io_error() => ErrorKind::Io,
            Error::Csv(_) | Error::DataIntegrity(_) => ErrorKind::DataIntegrity,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::StatisticalDegeneracy(_) => ErrorKind::StatisticalDegeneracy,
        }
    }
}

/// Broad error category, stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataIntegrity,
    Configuration,
    StatisticalDegeneracy,
    Io,
}

/// Malformed or inconsistent input data. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataIntegrityError {
    #[error("sell of {ticker} on {date} with no open position")]
    SellWithoutPosition { ticker: String, date: NaiveDate },

    #[error("no price for {ticker} on {date}")]
    MissingPrice { ticker: String, date: NaiveDate },

    #[error("trade on {date} has an empty ticker")]
    EmptyTicker { date: NaiveDate },

    #[error("no price series available for {ticker}")]
    MissingSeries { ticker: String },

    #[error("benchmark series has no price on start date {date}")]
    MissingBenchmarkStart { date: NaiveDate },

    #[error("{context}: {date} follows {previous}, dates must be in order")]
    UnorderedDates {
        context: String,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("invalid price {price} for {ticker} on {date}")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("invalid amount {amount} for {ticker} on {date}")]
    InvalidAmount {
        ticker: String,
        date: NaiveDate,
        amount: f64,
    },

    #[error("series length mismatch: {left} vs {right} points")]
    LengthMismatch { left: usize, right: usize },

    #[error("series dates diverge at index {index}: {left} vs {right}")]
    DateMismatch {
        index: usize,
        left: NaiveDate,
        right: NaiveDate,
    },

    #[error("{source_name} line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: u64,
        reason: String,
    },
}

/// Result type for portfolio-bench operations.
pub type Result<T> = std::result::Result<T, Error>;

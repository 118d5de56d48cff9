//! Portfolio P&L engine.
//!
//! Provides ledger replay, P&L aggregation, benchmark normalization and
//! benchmark comparison statistics.

mod benchmark;
mod pnl;
mod risk;
mod tracker;

pub use benchmark::normalize_benchmark;
pub use pnl::{aggregate_pnl, PnlSeries};
pub use risk::{
    business_days_between, calculate_statistics, pearson_correlation, population_std,
    risk_free_adjusted, TRADING_DAYS_PER_YEAR,
};
pub use tracker::{InstrumentPosition, PositionTable, PositionTracker, POSITION_EPSILON};

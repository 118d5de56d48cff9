//! Core data types for the portfolio benchmark engine.

use crate::{DataIntegrityError, Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single executed trade from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Trade date
    pub date: NaiveDate,
    /// Instrument ticker (uppercase)
    pub ticker: String,
    /// Signed quantity: positive buys, negative sells, zero is a no-op
    pub amount: f64,
    /// Execution price per unit
    pub price: f64,
}

impl Trade {
    /// Create a new trade.
    pub fn new(date: NaiveDate, ticker: &str, amount: f64, price: f64) -> Self {
        Self {
            date,
            ticker: ticker.trim().to_uppercase(),
            amount,
            price,
        }
    }

    /// Direction of the trade, `None` for zero-amount rows.
    pub fn side(&self) -> Option<TradeSide> {
        if self.amount > 0.0 {
            Some(TradeSide::Buy)
        } else if self.amount < 0.0 {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }

    /// Signed value of the trade at its execution price.
    pub fn value(&self) -> f64 {
        self.amount * self.price
    }

    fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(DataIntegrityError::EmptyTicker { date: self.date }.into());
        }
        if !self.amount.is_finite() {
            return Err(DataIntegrityError::InvalidAmount {
                ticker: self.ticker.clone(),
                date: self.date,
                amount: self.amount,
            }
            .into());
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(DataIntegrityError::InvalidPrice {
                ticker: self.ticker.clone(),
                date: self.date,
                price: self.price,
            }
            .into());
        }
        Ok(())
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A validated, date-ordered sequence of trades.
///
/// Ledger order is preserved exactly: trades sharing a date are replayed in
/// the order they were given.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    /// Build a ledger, rejecting empty input, malformed trades and
    /// decreasing dates.
    pub fn new(trades: Vec<Trade>) -> Result<Self> {
        if trades.is_empty() {
            return Err(Error::Configuration("trade ledger is empty".to_string()));
        }

        for trade in &trades {
            trade.validate()?;
        }

        for pair in trades.windows(2) {
            if pair[1].date < pair[0].date {
                return Err(DataIntegrityError::UnorderedDates {
                    context: "trade ledger".to_string(),
                    date: pair[1].date,
                    previous: pair[0].date,
                }
                .into());
            }
        }

        Ok(Self { trades })
    }

    /// All trades in ledger order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Date of the earliest trade.
    pub fn start_date(&self) -> NaiveDate {
        // Non-empty and ordered, checked in `new`
        self.trades[0].date
    }

    /// Date of the latest trade.
    pub fn end_date(&self) -> NaiveDate {
        self.trades[self.trades.len() - 1].date
    }

    /// Distinct tickers, sorted.
    pub fn tickers(&self) -> Vec<String> {
        self.trades
            .iter()
            .map(|t| t.ticker.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of trades.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Always false for a constructed ledger.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Daily closing prices for one instrument, strictly ordered by date.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    closes: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Build a series from `(date, close)` pairs in ascending date order.
    pub fn new(ticker: &str, points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Result<Self> {
        let ticker = ticker.trim().to_uppercase();
        let mut closes = BTreeMap::new();
        let mut previous: Option<NaiveDate> = None;

        for (date, close) in points {
            if let Some(prev) = previous {
                if date <= prev {
                    return Err(DataIntegrityError::UnorderedDates {
                        context: format!("{} prices", ticker),
                        date,
                        previous: prev,
                    }
                    .into());
                }
            }
            if !close.is_finite() || close <= 0.0 {
                return Err(DataIntegrityError::InvalidPrice {
                    ticker,
                    date,
                    price: close,
                }
                .into());
            }
            closes.insert(date, close);
            previous = Some(date);
        }

        Ok(Self { ticker, closes })
    }

    /// Instrument ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Closing price on `date`, if the instrument traded that day.
    pub fn close(&self, date: NaiveDate) -> Option<f64> {
        self.closes.get(&date).copied()
    }

    /// Trading dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.closes.keys().copied()
    }

    /// `(date, close)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.closes.iter().map(|(d, c)| (*d, *c))
    }

    /// Copy of the series restricted to dates on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            closes: self.closes.range(start..).map(|(d, c)| (*d, *c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// One dated value of a percentage series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A dated sequence of percentage values aligned to the analysis grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    /// Zip dates and values into a series.
    pub fn from_parts(dates: &[NaiveDate], values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            points: dates
                .iter()
                .zip(values)
                .map(|(&date, value)| SeriesPoint { date, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Dates of the series in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Values of the series in order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Value on `date`, if present.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].value)
    }

    /// Last point of the series.
    pub fn last(&self) -> Option<SeriesPoint> {
        self.points.last().copied()
    }

    /// Smallest value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::min)
    }

    /// Largest value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::max)
    }
}

/// Benchmark comparison statistics for a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryStatistics {
    /// Single-period CAPM alpha in percentage points
    pub alpha: f64,
    /// Portfolio beta against the benchmark
    pub beta: f64,
    /// Pearson correlation of total P&L and benchmark change
    pub correlation: f64,
    /// Population standard deviation of total P&L
    pub portfolio_std: f64,
    /// Population standard deviation of benchmark change
    pub benchmark_std: f64,
    /// Risk-free return compounded over the elapsed business days, in %
    pub risk_free_adjusted: f64,
    /// Lowest total P&L %
    pub portfolio_min: f64,
    /// Highest total P&L %
    pub portfolio_max: f64,
    /// Lowest benchmark change %
    pub benchmark_min: f64,
    /// Highest benchmark change %
    pub benchmark_max: f64,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<crate::ErrorKind>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            kind: None,
        }
    }

    /// Create an error response carrying the error category.
    pub fn from_error(error: &Error) -> Self {
        Self {
            kind: Some(error.kind()),
            ..Self::err(error.to_string())
        }
    }
}

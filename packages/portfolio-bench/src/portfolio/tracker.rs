//! Ledger replay with average-cost position tracking.

use crate::types::{Trade, TradeLedger, TradeSide};
use crate::{DataIntegrityError, Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Held amounts within this distance of zero count as a closed position.
///
/// Fractional quantities rarely cancel exactly (`0.1 + 0.2 - 0.3` leaves
/// `5.55e-17`), so a flat position is recognized by tolerance and then reset
/// to exactly zero.
pub const POSITION_EPSILON: f64 = 1e-9;

/// Held quantity and aggregate cost basis of one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InstrumentPosition {
    /// Cumulative signed quantity
    pub held_amount: f64,
    /// Cumulative invested value attributable to `held_amount` (not per unit)
    pub cost_basis: f64,
}

impl InstrumentPosition {
    /// True when the held amount is non-zero beyond [`POSITION_EPSILON`].
    pub fn is_open(&self) -> bool {
        self.held_amount.abs() > POSITION_EPSILON
    }

    /// Average cost per unit, `None` when nothing is held.
    pub fn average_cost(&self) -> Option<f64> {
        if self.is_open() {
            Some(self.cost_basis / self.held_amount)
        } else {
            None
        }
    }

    /// Mark-to-market gain/loss in currency at `price`.
    pub fn unrealized(&self, price: f64) -> f64 {
        price * self.held_amount - self.cost_basis
    }
}

/// Per-date, per-instrument state produced by [`PositionTracker::replay`].
///
/// Columnar layout: every column is indexed in parallel with `dates`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<InstrumentPosition>>,
    invested: Vec<f64>,
    realized: Vec<f64>,
    unapplied_trades: usize,
}

impl PositionTable {
    /// Grid dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Tracked tickers, sorted.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// All `(ticker, column)` pairs in ticker order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[InstrumentPosition])> {
        self.columns.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    /// Column of positions for `ticker`.
    pub fn column(&self, ticker: &str) -> Option<&[InstrumentPosition]> {
        self.columns.get(ticker).map(Vec::as_slice)
    }

    /// Position of `ticker` on `date`.
    pub fn position(&self, ticker: &str, date: NaiveDate) -> Option<InstrumentPosition> {
        let idx = self.dates.binary_search(&date).ok()?;
        self.columns.get(ticker).map(|col| col[idx])
    }

    /// Cumulative capital committed at cost, per date.
    pub fn invested(&self) -> &[f64] {
        &self.invested
    }

    /// Cumulative realized P&L as % of initial investment, per date.
    pub fn realized(&self) -> &[f64] {
        &self.realized
    }

    /// Trades dated after the last grid date.
    pub fn unapplied_trades(&self) -> usize {
        self.unapplied_trades
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Replays a trade ledger over a date grid using average-cost accounting.
#[derive(Debug, Clone, Copy)]
pub struct PositionTracker {
    initial_investment: f64,
}

impl PositionTracker {
    /// Create a tracker. Realized P&L is expressed relative to
    /// `initial_investment`, which must be positive.
    pub fn new(initial_investment: f64) -> Result<Self> {
        if !initial_investment.is_finite() || initial_investment <= 0.0 {
            return Err(Error::Configuration(format!(
                "initial investment must be positive, got {}",
                initial_investment
            )));
        }
        Ok(Self { initial_investment })
    }

    pub fn initial_investment(&self) -> f64 {
        self.initial_investment
    }

    /// Replay `ledger` over `grid`, forward-filling state between trades.
    ///
    /// A trade takes effect from the first grid date on or after its own
    /// date. Trades beyond the last grid date are still replayed so integrity
    /// errors surface, but are not visible in the table.
    pub fn replay(&self, ledger: &TradeLedger, grid: &[NaiveDate]) -> Result<PositionTable> {
        let Some(&first) = grid.first() else {
            return Err(DataIntegrityError::MissingBenchmarkStart {
                date: ledger.start_date(),
            }
            .into());
        };
        for pair in grid.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataIntegrityError::UnorderedDates {
                    context: "date grid".to_string(),
                    date: pair[1],
                    previous: pair[0],
                }
                .into());
            }
        }

        let tickers = ledger.tickers();
        if tickers.is_empty() {
            return Err(Error::Configuration(
                "instrument universe is empty".to_string(),
            ));
        }
        if ledger.start_date() < first {
            debug!(
                start = %ledger.start_date(),
                grid_start = %first,
                "ledger starts before grid, early trades roll onto first grid date"
            );
        }

        let mut acc = Accumulator::new(self.initial_investment, &tickers);
        let mut columns: BTreeMap<String, Vec<InstrumentPosition>> = tickers
            .iter()
            .map(|t| (t.clone(), Vec::with_capacity(grid.len())))
            .collect();
        let mut invested = Vec::with_capacity(grid.len());
        let mut realized = Vec::with_capacity(grid.len());

        let trades = ledger.trades();
        let mut next = 0;

        for &date in grid {
            while next < trades.len() && trades[next].date <= date {
                acc.apply(&trades[next])?;
                next += 1;
            }
            for (ticker, column) in columns.iter_mut() {
                column.push(acc.position(ticker));
            }
            invested.push(acc.invested);
            realized.push(acc.realized);
        }

        let unapplied_trades = trades.len() - next;
        for trade in &trades[next..] {
            warn!(
                ticker = %trade.ticker,
                date = %trade.date,
                "trade dated after the last grid date is not reflected in the series"
            );
            acc.apply(trade)?;
        }

        debug!(
            dates = grid.len(),
            instruments = columns.len(),
            trades = trades.len(),
            unapplied_trades,
            "ledger replay complete"
        );

        Ok(PositionTable {
            dates: grid.to_vec(),
            columns,
            invested,
            realized,
            unapplied_trades,
        })
    }
}

/// Running state carried across the replay.
struct Accumulator<'a> {
    initial_investment: f64,
    positions: BTreeMap<&'a str, InstrumentPosition>,
    invested: f64,
    realized: f64,
}

impl<'a> Accumulator<'a> {
    fn new(initial_investment: f64, tickers: &'a [String]) -> Self {
        Self {
            initial_investment,
            positions: tickers
                .iter()
                .map(|t| (t.as_str(), InstrumentPosition::default()))
                .collect(),
            invested: 0.0,
            realized: 0.0,
        }
    }

    fn position(&self, ticker: &str) -> InstrumentPosition {
        self.positions.get(ticker).copied().unwrap_or_default()
    }

    fn apply(&mut self, trade: &Trade) -> Result<()> {
        let Some(side) = trade.side() else {
            return Ok(());
        };

        let position = self
            .positions
            .get_mut(trade.ticker.as_str())
            .ok_or_else(|| DataIntegrityError::MissingSeries {
                ticker: trade.ticker.clone(),
            })?;
        let amount = trade.amount;

        match side {
            TradeSide::Buy => {
                let cost = trade.value();
                position.cost_basis += cost;
                self.invested += cost;
            }
            TradeSide::Sell => {
                let average_cost = position.average_cost().ok_or_else(|| {
                    DataIntegrityError::SellWithoutPosition {
                        ticker: trade.ticker.clone(),
                        date: trade.date,
                    }
                })?;
                let released = amount * average_cost;
                position.cost_basis += released;
                self.invested += released;
                // Negative amount: selling above average cost yields a gain
                self.realized +=
                    amount * (average_cost - trade.price) / self.initial_investment * 100.0;
            }
        }
        position.held_amount += amount;

        if !position.is_open() {
            position.held_amount = 0.0;
            // A sell scales cost basis with the held amount, so only rounding is left
            if side == TradeSide::Sell {
                position.cost_basis = 0.0;
            }
        }

        debug!(
            ticker = %trade.ticker,
            date = %trade.date,
            amount,
            price = trade.price,
            held = position.held_amount,
            cost_basis = position.cost_basis,
            "applied trade"
        );
        Ok(())
    }
}

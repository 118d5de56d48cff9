//! Portfolio-level P&L aggregation.

use super::tracker::PositionTable;
use crate::types::{PriceSeries, Series};
use crate::{DataIntegrityError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unrealized, realized and total P&L, each as % of initial investment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PnlSeries {
    pub unrealized: Series,
    pub realized: Series,
    pub total: Series,
}

/// Combine replayed positions with closing prices into portfolio P&L.
///
/// A price is required for an instrument on every date it is held. While the
/// position is closed (see [`is_open`](super::InstrumentPosition::is_open))
/// its contribution is `-cost_basis` (zero before the first trade) and its
/// price series is not consulted, so instruments that had not started
/// trading yet, or were sold out of and delisted, need no price.
///
/// # Errors
///
/// `DataIntegrityError::MissingPrice` when a held instrument has no close on a
/// grid date, or when it has no series at all.
pub fn aggregate_pnl(
    table: &PositionTable,
    prices: &BTreeMap<String, PriceSeries>,
    initial_investment: f64,
) -> Result<PnlSeries> {
    let dates = table.dates();
    let mut unrealized = vec![0.0; dates.len()];

    for (ticker, column) in table.columns() {
        let series = prices.get(ticker);

        for (idx, (date, position)) in dates.iter().zip(column).enumerate() {
            let gain = if position.is_open() {
                let close = series.and_then(|s| s.close(*date)).ok_or_else(|| {
                    DataIntegrityError::MissingPrice {
                        ticker: ticker.to_string(),
                        date: *date,
                    }
                })?;
                position.unrealized(close)
            } else {
                -position.cost_basis
            };
            unrealized[idx] += gain / initial_investment * 100.0;
        }
    }

    let realized = table.realized();
    let total: Vec<f64> = unrealized
        .iter()
        .zip(realized)
        .map(|(u, r)| u + r)
        .collect();

    Ok(PnlSeries {
        unrealized: Series::from_parts(dates, unrealized),
        realized: Series::from_parts(dates, realized.iter().copied()),
        total: Series::from_parts(dates, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::PositionTracker;
    use crate::types::{Trade, TradeLedger};
    use crate::{DataIntegrityError, Error};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn book(series: Vec<PriceSeries>) -> BTreeMap<String, PriceSeries> {
        series
            .into_iter()
            .map(|s| (s.ticker().to_string(), s))
            .collect()
    }

    fn replay(trades: Vec<Trade>, dates: &[NaiveDate], initial: f64) -> PositionTable {
        PositionTracker::new(initial)
            .unwrap()
            .replay(&TradeLedger::new(trades).unwrap(), dates)
            .unwrap()
    }

    #[test]
    fn test_single_buy_marks_to_market() {
        let dates = [day(2), day(3)];
        let table = replay(vec![Trade::new(day(2), "AAPL", 10.0, 100.0)], &dates, 1000.0);
        let prices = book(vec![
            PriceSeries::new("AAPL", vec![(day(2), 100.0), (day(3), 110.0)]).unwrap(),
        ]);

        let pnl = aggregate_pnl(&table, &prices, 1000.0).unwrap();

        assert_eq!(pnl.unrealized.values(), vec![0.0, 10.0]);
        assert_eq!(pnl.realized.values(), vec![0.0, 0.0]);
        assert_eq!(pnl.total.values(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_total_is_unrealized_plus_realized() {
        let dates = [day(2), day(3), day(4)];
        let table = replay(
            vec![
                Trade::new(day(2), "AAPL", 10.0, 100.0),
                Trade::new(day(2), "MSFT", 5.0, 40.0),
                Trade::new(day(3), "AAPL", -4.0, 120.0),
            ],
            &dates,
            2000.0,
        );
        let prices = book(vec![
            PriceSeries::new("AAPL", vec![(day(2), 100.0), (day(3), 120.0), (day(4), 90.0)])
                .unwrap(),
            PriceSeries::new("MSFT", vec![(day(2), 40.0), (day(3), 44.0), (day(4), 50.0)])
                .unwrap(),
        ]);

        let pnl = aggregate_pnl(&table, &prices, 2000.0).unwrap();

        // Day 3: realized -4 * (100 - 120) = 80 -> 4%
        assert_relative_eq!(pnl.realized.values()[1], 4.0, epsilon = 1e-12);
        // Day 4: AAPL 6 * 90 - 600 = -60, MSFT 5 * 50 - 200 = 50 -> -0.5%
        assert_relative_eq!(pnl.unrealized.values()[2], -0.5, epsilon = 1e-12);
        for i in 0..dates.len() {
            assert_eq!(
                pnl.total.values()[i],
                pnl.unrealized.values()[i] + pnl.realized.values()[i]
            );
        }
    }

    #[test]
    fn test_unheld_instrument_needs_no_price() {
        let dates = [day(2), day(3), day(4)];
        let table = replay(
            vec![
                Trade::new(day(2), "AAPL", 1.0, 10.0),
                Trade::new(day(4), "NEWCO", 2.0, 5.0),
            ],
            &dates,
            100.0,
        );
        // NEWCO only starts trading on day 4
        let prices = book(vec![
            PriceSeries::new("AAPL", vec![(day(2), 10.0), (day(3), 11.0), (day(4), 12.0)])
                .unwrap(),
            PriceSeries::new("NEWCO", vec![(day(4), 6.0)]).unwrap(),
        ]);

        let pnl = aggregate_pnl(&table, &prices, 100.0).unwrap();

        assert_relative_eq!(pnl.unrealized.values()[1], 1.0, epsilon = 1e-12);
        // AAPL +2, NEWCO +2 -> 4%
        assert_relative_eq!(pnl.unrealized.values()[2], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_price_for_held_instrument_fails() {
        let dates = [day(2), day(3)];
        let table = replay(vec![Trade::new(day(2), "AAPL", 1.0, 10.0)], &dates, 100.0);
        let prices = book(vec![PriceSeries::new("AAPL", vec![(day(2), 10.0)]).unwrap()]);

        match aggregate_pnl(&table, &prices, 100.0) {
            Err(Error::DataIntegrity(DataIntegrityError::MissingPrice { ticker, date })) => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(date, day(3));
            }
            other => panic!("expected MissingPrice, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_series_for_held_instrument_fails() {
        let dates = [day(2)];
        let table = replay(vec![Trade::new(day(2), "AAPL", 1.0, 10.0)], &dates, 100.0);

        let result = aggregate_pnl(&table, &BTreeMap::new(), 100.0);
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::MissingPrice { .. }))
        ));
    }

    #[test]
    fn test_fractional_close_needs_no_later_price() {
        let dates = [day(2), day(3), day(4)];
        let table = replay(
            vec![
                Trade::new(day(2), "BTC", 0.1, 100.0),
                Trade::new(day(2), "BTC", 0.2, 100.0),
                Trade::new(day(3), "BTC", -0.3, 120.0),
            ],
            &dates,
            100.0,
        );
        // Delisted after the position was sold out
        let prices = book(vec![
            PriceSeries::new("BTC", vec![(day(2), 100.0), (day(3), 120.0)]).unwrap(),
        ]);

        let pnl = aggregate_pnl(&table, &prices, 100.0).unwrap();

        assert_eq!(pnl.unrealized.values()[2], 0.0);
        // -0.3 * (100 - 120) = 6 -> 6%
        assert_relative_eq!(pnl.realized.values()[2], 6.0, epsilon = 1e-9);
        assert_relative_eq!(pnl.total.values()[2], 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closed_position_contributes_residual_cost_only() {
        let dates = [day(2), day(3), day(4)];
        let table = replay(
            vec![
                Trade::new(day(2), "AAPL", 2.0, 50.0),
                Trade::new(day(3), "AAPL", -2.0, 60.0),
            ],
            &dates,
            100.0,
        );
        // No AAPL price after the position is closed
        let prices = book(vec![PriceSeries::new("AAPL", vec![(day(2), 50.0)]).unwrap()]);

        let pnl = aggregate_pnl(&table, &prices, 100.0).unwrap();

        assert_eq!(pnl.unrealized.values()[2], 0.0);
        assert_relative_eq!(pnl.total.values()[2], 20.0, epsilon = 1e-12);
    }
}

//! End-to-end analysis run: ledger replay, P&L and benchmark statistics.

use crate::config::AnalysisConfig;
use crate::portfolio::{
    aggregate_pnl, business_days_between, calculate_statistics, normalize_benchmark,
    PositionTracker,
};
use crate::prices::PriceSource;
use crate::types::{PriceSeries, Series, SummaryStatistics, TradeLedger};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Everything the presentation layer needs from one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    /// Benchmark ticker
    pub benchmark_ticker: String,
    /// Earliest trade date, first date of every series
    pub start_date: NaiveDate,
    /// Date the risk-free return is compounded up to
    pub evaluation_date: NaiveDate,
    /// Weekdays in `[start_date, evaluation_date)`
    pub business_days: u32,
    /// Unrealized P&L in % of initial investment
    pub unrealized: Series,
    /// Realized P&L in % of initial investment
    pub realized: Series,
    /// Total P&L in % of initial investment
    pub total: Series,
    /// Benchmark change in % since the start date
    pub benchmark: Series,
    /// Benchmark comparison statistics
    pub statistics: SummaryStatistics,
    /// Trades dated after the last benchmark date
    pub unapplied_trades: usize,
}

/// Run the full pipeline on already-materialized price series.
///
/// `prices` must hold a series for every ledger ticker that is held on some
/// grid date; `benchmark` must trade on the ledger's start date.
pub fn analyze(
    config: &AnalysisConfig,
    ledger: &TradeLedger,
    benchmark: &PriceSeries,
    prices: &BTreeMap<String, PriceSeries>,
    evaluation_date: NaiveDate,
) -> Result<AnalysisReport> {
    config.validate()?;
    let tracker = PositionTracker::new(config.initial_investment)?;
    let start_date = ledger.start_date();

    let benchmark_pct = normalize_benchmark(benchmark, start_date)?;
    let grid: Vec<NaiveDate> = benchmark_pct.dates().collect();

    let table = tracker.replay(ledger, &grid)?;
    let pnl = aggregate_pnl(&table, prices, tracker.initial_investment())?;

    let business_days = business_days_between(start_date, evaluation_date);
    let statistics = calculate_statistics(
        &pnl.total,
        &benchmark_pct,
        config.risk_free_return,
        business_days,
    )?;

    info!(
        benchmark = %config.benchmark_ticker,
        start = %start_date,
        last_trade = %ledger.end_date(),
        dates = grid.len(),
        instruments = ledger.tickers().len(),
        alpha = statistics.alpha,
        beta = statistics.beta,
        "analysis complete"
    );

    Ok(AnalysisReport {
        benchmark_ticker: config.benchmark_ticker.clone(),
        start_date,
        evaluation_date,
        business_days,
        unrealized: pnl.unrealized,
        realized: pnl.realized,
        total: pnl.total,
        benchmark: benchmark_pct,
        statistics,
        unapplied_trades: table.unapplied_trades(),
    })
}

/// An analysis bound to its configuration and ledger.
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
    ledger: TradeLedger,
}

impl Analysis {
    /// Validate the configuration and bind it to a ledger.
    pub fn new(config: AnalysisConfig, ledger: TradeLedger) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Fetch every series from `source`, then run [`analyze`].
    pub fn run(
        &self,
        source: &dyn PriceSource,
        evaluation_date: NaiveDate,
    ) -> Result<AnalysisReport> {
        let start = self.ledger.start_date();
        let benchmark = source.closes(&self.config.benchmark_ticker, start)?;

        let mut prices = BTreeMap::new();
        for ticker in self.ledger.tickers() {
            let series = source.closes(&ticker, start)?;
            prices.insert(ticker, series);
        }
        info!(
            instruments = prices.len(),
            benchmark_points = benchmark.len(),
            "price series loaded"
        );

        analyze(&self.config, &self.ledger, &benchmark, &prices, evaluation_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::InMemoryPrices;
    use crate::types::Trade;
    use crate::{DataIntegrityError, Error};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series(ticker: &str, closes: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(ticker, closes.iter().map(|&(d, c)| (day(d), c))).unwrap()
    }

    fn source() -> InMemoryPrices {
        InMemoryPrices::new()
            .with(series(
                "SPY",
                &[(1, 400.0), (2, 400.0), (3, 404.0), (4, 412.0), (5, 408.0), (8, 420.0)],
            ))
            .with(series(
                "AAPL",
                &[(2, 100.0), (3, 110.0), (4, 105.0), (5, 120.0), (8, 118.0)],
            ))
            .with(series("MSFT", &[(4, 50.0), (5, 55.0), (8, 60.0)]))
    }

    fn ledger() -> TradeLedger {
        TradeLedger::new(vec![
            Trade::new(day(2), "AAPL", 10.0, 100.0),
            Trade::new(day(4), "MSFT", 20.0, 50.0),
            Trade::new(day(5), "AAPL", -5.0, 120.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_run_end_to_end() {
        let config = AnalysisConfig::new("SPY", 1000.0, 4.0);
        let report = Analysis::new(config, ledger())
            .unwrap()
            .run(&source(), day(8))
            .unwrap();

        // Grid starts at the first trade, not at the first benchmark date
        assert_eq!(report.start_date, day(2));
        assert_eq!(report.total.len(), 5);
        assert_eq!(report.benchmark.len(), 5);
        assert_eq!(report.business_days, 4);

        // Day 3: AAPL 10 * 110 - 1000 = 100 -> 10%
        assert_eq!(report.unrealized.value_at(day(3)), Some(10.0));
        // Day 5: sell 5 at 120, avg cost 100 -> realized 100 -> 10%
        let realized = report.realized.value_at(day(5)).unwrap();
        assert_relative_eq!(realized, 10.0, epsilon = 1e-12);
        // Day 8: AAPL 5 * 118 - 500 = 90, MSFT 20 * 60 - 1000 = 200 -> 29%
        let last = day(8);
        assert_relative_eq!(report.unrealized.value_at(last).unwrap(), 29.0, epsilon = 1e-12);
        assert_relative_eq!(report.total.value_at(last).unwrap(), 39.0, epsilon = 1e-12);
        assert_relative_eq!(report.benchmark.value_at(last).unwrap(), 5.0, epsilon = 1e-12);

        let stats = &report.statistics;
        assert_eq!(stats.portfolio_min, 0.0);
        assert_relative_eq!(stats.portfolio_max, 39.0, epsilon = 1e-12);
        assert_eq!(stats.benchmark_min, 0.0);
        assert!(stats.correlation > 0.0 && stats.correlation <= 1.0);
        assert!(stats.alpha.is_finite() && stats.beta.is_finite());
        assert_eq!(report.unapplied_trades, 0);
    }

    #[test]
    fn test_run_is_bit_identical() {
        let analysis = Analysis::new(AnalysisConfig::new("SPY", 1234.5, 3.3), ledger()).unwrap();

        let first = analysis.run(&source(), day(8)).unwrap();
        let second = analysis.run(&source(), day(8)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_portfolio_tracking_benchmark_has_zero_alpha() {
        // Buying the benchmark itself with the whole investment reproduces it
        let ledger = TradeLedger::new(vec![Trade::new(day(2), "SPY", 2.5, 400.0)]).unwrap();
        let config = AnalysisConfig::new("SPY", 1000.0, 5.0);

        let report = Analysis::new(config, ledger)
            .unwrap()
            .run(&source(), day(8))
            .unwrap();

        for (p, b) in report.total.values().iter().zip(report.benchmark.values()) {
            assert_relative_eq!(*p, b, epsilon = 1e-9);
        }
        assert_relative_eq!(report.statistics.correlation, 1.0, epsilon = 1e-9);
        assert_relative_eq!(report.statistics.beta, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.statistics.alpha, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sell_without_position_aborts_run() {
        let ledger = TradeLedger::new(vec![Trade::new(day(2), "X", -5.0, 10.0)]).unwrap();
        let source = source().with(series("X", &[(2, 10.0), (3, 11.0)]));

        let result = Analysis::new(AnalysisConfig::new("SPY", 1000.0, 1.0), ledger)
            .unwrap()
            .run(&source, day(8));
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::SellWithoutPosition { .. }))
        ));
    }

    #[test]
    fn test_missing_benchmark_start_aborts_run() {
        let source = InMemoryPrices::new()
            .with(series("SPY", &[(3, 400.0), (4, 410.0)]))
            .with(series("AAPL", &[(2, 100.0), (3, 110.0), (4, 105.0)]));
        let ledger = TradeLedger::new(vec![Trade::new(day(2), "AAPL", 1.0, 100.0)]).unwrap();

        let result = Analysis::new(AnalysisConfig::new("SPY", 1000.0, 1.0), ledger)
            .unwrap()
            .run(&source, day(8));
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::MissingBenchmarkStart { .. }))
        ));
    }

    #[test]
    fn test_missing_instrument_series_aborts_run() {
        let ledger = TradeLedger::new(vec![Trade::new(day(2), "TSLA", 1.0, 100.0)]).unwrap();

        let result = Analysis::new(AnalysisConfig::new("SPY", 1000.0, 1.0), ledger)
            .unwrap()
            .run(&source(), day(8));
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::MissingSeries { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Analysis::new(AnalysisConfig::new("SPY", 0.0, 1.0), ledger());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}

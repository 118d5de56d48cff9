//! Benchmark normalization.

use crate::types::{PriceSeries, Series, SeriesPoint};
use crate::{DataIntegrityError, Result};
use chrono::NaiveDate;

/// Percentage change of `prices` relative to its close on `start`.
///
/// Dates before `start` are dropped; the remaining dates form the analysis
/// grid. Fails when the benchmark did not trade on `start`.
pub fn normalize_benchmark(prices: &PriceSeries, start: NaiveDate) -> Result<Series> {
    let anchor = prices
        .close(start)
        .ok_or(DataIntegrityError::MissingBenchmarkStart { date: start })?;

    let points = prices
        .since(start)
        .iter()
        .map(|(date, close)| SeriesPoint {
            date,
            value: 100.0 * (close / anchor - 1.0),
        })
        .collect();

    Ok(Series { points })
}

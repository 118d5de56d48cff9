//! Benchmark comparison statistics.
//!
//! Provides population standard deviation, Pearson correlation, beta,
//! single-period CAPM alpha and the business-day risk-free adjustment.

use crate::types::{Series, SummaryStatistics};
use crate::{DataIntegrityError, Error, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Trading days per year used to annualize the risk-free rate.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calculate benchmark comparison statistics.
///
/// # Arguments
///
/// * `total` - Portfolio total P&L in % of initial investment
/// * `benchmark` - Benchmark change in %, aligned date-for-date with `total`
/// * `risk_free_rate` - Annual risk-free rate in % (e.g. 4.5 for 4.5%)
/// * `business_days` - Business days elapsed since the start date
///
/// # Returns
///
/// `SummaryStatistics`, or an error if the series are misaligned or either
/// has zero variance.
pub fn calculate_statistics(
    total: &Series,
    benchmark: &Series,
    risk_free_rate: f64,
    business_days: u32,
) -> Result<SummaryStatistics> {
    if total.len() != benchmark.len() {
        return Err(DataIntegrityError::LengthMismatch {
            left: total.len(),
            right: benchmark.len(),
        }
        .into());
    }
    if let Some((index, (left, right))) = total
        .dates()
        .zip(benchmark.dates())
        .enumerate()
        .find(|(_, (l, r))| l != r)
    {
        return Err(DataIntegrityError::DateMismatch { index, left, right }.into());
    }

    // Both series are empty together; lengths were checked above
    let (Some(portfolio_last), Some(benchmark_last), Some(portfolio_min), Some(portfolio_max)) =
        (total.last(), benchmark.last(), total.min(), total.max())
    else {
        return Err(Error::StatisticalDegeneracy(
            "need at least two data points".to_string(),
        ));
    };
    let (Some(benchmark_min), Some(benchmark_max)) = (benchmark.min(), benchmark.max()) else {
        return Err(Error::StatisticalDegeneracy(
            "need at least two data points".to_string(),
        ));
    };

    let portfolio = total.values();
    let bench = benchmark.values();
    let correlation = pearson_correlation(&portfolio, &bench)?;
    let portfolio_std = population_std(&portfolio);
    let benchmark_std = population_std(&bench);
    let beta = correlation * portfolio_std / benchmark_std;

    let rf = risk_free_adjusted(risk_free_rate, business_days);
    let alpha = portfolio_last.value - rf - beta * (benchmark_last.value - rf);

    Ok(SummaryStatistics {
        alpha,
        beta,
        correlation,
        portfolio_std,
        benchmark_std,
        risk_free_adjusted: rf,
        portfolio_min,
        portfolio_max,
        benchmark_min,
        benchmark_max,
    })
}

/// Population standard deviation (divides by `n`).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Pearson correlation coefficient of two equally long series.
///
/// Fails with `StatisticalDegeneracy` when either series is constant or
/// shorter than two points, since the coefficient is undefined there.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(DataIntegrityError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        }
        .into());
    }
    if x.len() < 2 {
        return Err(Error::StatisticalDegeneracy(
            "need at least two data points".to_string(),
        ));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_y == 0.0 {
        return Err(Error::StatisticalDegeneracy(
            "benchmark series has zero variance, beta is undefined".to_string(),
        ));
    }
    if var_x == 0.0 {
        return Err(Error::StatisticalDegeneracy(
            "portfolio series has zero variance, correlation is undefined".to_string(),
        ));
    }

    // Clamp rounding overshoot past +/-1
    Ok((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Compound an annual risk-free rate (%) over `business_days` trading days.
///
/// Returns the period return in %: `100 * ((1 + rfr/100)^(days/252) - 1)`.
pub fn risk_free_adjusted(risk_free_rate: f64, business_days: u32) -> f64 {
    let years = business_days as f64 / TRADING_DAYS_PER_YEAR;
    100.0 * ((1.0 + risk_free_rate / 100.0).powf(years) - 1.0)
}

/// Count weekdays in the half-open interval `[start, end)`.
///
/// Returns 0 when `end` is not after `start`. Holidays are not excluded.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }

    let days = (end - start).num_days();
    let full_weeks = days / 7;
    let mut count = full_weeks * 5;

    let mut day = start + Duration::days(full_weeks * 7);
    while day < end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        day += Duration::days(1);
    }

    count as u32
}

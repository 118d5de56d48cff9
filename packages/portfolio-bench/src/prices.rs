//! Daily closing-price sources.

use crate::ledger::{column_index, parse_date, parse_number};
use crate::types::PriceSeries;
use crate::{DataIntegrityError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Supplies closing-price series for instruments and the benchmark.
///
/// Implementations do all I/O up front; the engine only sees the returned
/// in-memory series.
pub trait PriceSource {
    /// Closing prices for `ticker` on and after `start`.
    fn closes(&self, ticker: &str, start: NaiveDate) -> Result<PriceSeries>;
}

/// Reads `<root>/<TICKER>.csv` files with `Date` and `Close` columns.
#[derive(Debug, Clone)]
pub struct CsvPriceDirectory {
    root: PathBuf,
}

impl CsvPriceDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the price file for `ticker`.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.root
            .join(format!("{}.csv", ticker.trim().to_uppercase()))
    }
}

impl PriceSource for CsvPriceDirectory {
    fn closes(&self, ticker: &str, start: NaiveDate) -> Result<PriceSeries> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(DataIntegrityError::MissingSeries {
                ticker: ticker.to_string(),
            }
            .into());
        }

        let series = read_price_csv(ticker, File::open(&path)?, &path.display().to_string())?;
        debug!(
            ticker,
            path = %path.display(),
            points = series.len(),
            "loaded price series"
        );
        Ok(series.since(start))
    }
}

/// Parse a price CSV: first column is the date, plus a `Close` column.
pub fn read_price_csv<R: Read>(ticker: &str, reader: R, source_name: &str) -> Result<PriceSeries> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let close_col = column_index(&headers, "Close", source_name)?;

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let date = parse_date(record.get(0).unwrap_or(""), source_name, line)?;
        let close = parse_number(record.get(close_col).unwrap_or(""), "close", source_name, line)?;
        points.push((date, close));
    }

    PriceSeries::new(ticker, points)
}

/// Price series held in memory, keyed by uppercase ticker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrices {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the series for its ticker.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }
}

impl PriceSource for InMemoryPrices {
    fn closes(&self, ticker: &str, start: NaiveDate) -> Result<PriceSeries> {
        self.series
            .get(&ticker.trim().to_uppercase())
            .map(|s| s.since(start))
            .ok_or_else(|| {
                DataIntegrityError::MissingSeries {
                    ticker: ticker.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_read_price_csv() {
        let csv = "Date,Open,High,Low,Close,Volume\n\
                   2024-01-02,10,11,9,10.5,100\n\
                   2024-01-03,10.5,12,10,11.25,200\n";

        let series = read_price_csv("spy", csv.as_bytes(), "SPY.csv").unwrap();

        assert_eq!(series.ticker(), "SPY");
        assert_eq!(series.close(day(2)), Some(10.5));
        assert_eq!(series.close(day(3)), Some(11.25));
    }

    #[test]
    fn test_read_price_csv_rejects_unsorted_rows() {
        let csv = "Date,Close\n2024-01-03,1\n2024-01-02,2\n";
        let result = read_price_csv("SPY", csv.as_bytes(), "SPY.csv");
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::UnorderedDates { .. }))
        ));
    }

    #[test]
    fn test_csv_directory_filters_start() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("AAPL.csv"),
            "Date,Close\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n",
        )
        .unwrap();

        let source = CsvPriceDirectory::new(dir.path());
        let series = source.closes("aapl", day(2)).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.close(day(1)), None);
        assert_eq!(series.close(day(3)), Some(3.0));
    }

    #[test]
    fn test_csv_directory_missing_file() {
        let dir = tempdir().unwrap();
        let source = CsvPriceDirectory::new(dir.path());

        let result = source.closes("NOPE", day(1));
        assert!(matches!(
            result,
            Err(Error::DataIntegrity(DataIntegrityError::MissingSeries { .. }))
        ));
    }

    #[test]
    fn test_in_memory_prices() {
        let prices = InMemoryPrices::new()
            .with(PriceSeries::new("SPY", vec![(day(1), 1.0), (day(2), 2.0)]).unwrap());

        assert_eq!(prices.closes("spy", day(2)).unwrap().len(), 1);
        assert!(prices.closes("QQQ", day(1)).is_err());
    }
}

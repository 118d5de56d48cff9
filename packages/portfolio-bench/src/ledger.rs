//! Trade ledger CSV parsing.
//!
//! Expected layout: the first column holds the trade date (`YYYY-MM-DD`),
//! followed by `Ticker`, `Amount` and `Price` columns in any order. Spaces
//! after delimiters are ignored.
//!
//! ```text
//! Date,Ticker,Amount,Price
//! 2024-01-02, AAPL, 10, 185.64
//! 2024-02-01, AAPL, -4, 186.86
//! ```

use crate::types::{Trade, TradeLedger};
use crate::{DataIntegrityError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Load a trade ledger from a CSV file.
pub fn load_ledger(path: &Path) -> Result<TradeLedger> {
    let file = File::open(path)?;
    let ledger = read_ledger(file, &path.display().to_string())?;
    info!(
        path = %path.display(),
        trades = ledger.len(),
        start = %ledger.start_date(),
        "loaded trade ledger"
    );
    Ok(ledger)
}

/// Parse a trade ledger from CSV. `source_name` labels error messages.
pub fn read_ledger<R: Read>(reader: R, source_name: &str) -> Result<TradeLedger> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let ticker_col = column_index(&headers, "Ticker", source_name)?;
    let amount_col = column_index(&headers, "Amount", source_name)?;
    let price_col = column_index(&headers, "Price", source_name)?;

    let mut trades = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| DataIntegrityError::MalformedRecord {
            source_name: source_name.to_string(),
            line,
            reason,
        };

        let date = parse_date(field(&record, 0), source_name, line)?;
        let ticker = field(&record, ticker_col);
        if ticker.is_empty() {
            return Err(malformed("empty ticker".to_string()).into());
        }
        let amount = parse_number(field(&record, amount_col), "amount", source_name, line)?;
        let price = parse_number(field(&record, price_col), "price", source_name, line)?;

        trades.push(Trade::new(date, ticker, amount, price));
    }

    TradeLedger::new(trades)
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

pub(crate) fn column_index(headers: &StringRecord, name: &str, source_name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            DataIntegrityError::MalformedRecord {
                source_name: source_name.to_string(),
                line: 1,
                reason: format!("missing '{}' column", name),
            }
            .into()
        })
}

pub(crate) fn parse_date(value: &str, source_name: &str, line: u64) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        DataIntegrityError::MalformedRecord {
            source_name: source_name.to_string(),
            line,
            reason: format!("invalid date '{}': {}", value, e),
        }
        .into()
    })
}

pub(crate) fn parse_number(value: &str, what: &str, source_name: &str, line: u64) -> Result<f64> {
    value.parse::<f64>().map_err(|_| {
        DataIntegrityError::MalformedRecord {
            source_name: source_name.to_string(),
            line,
            reason: format!("invalid {} '{}'", what, value),
        }
        .into()
    })
}

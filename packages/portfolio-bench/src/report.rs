//! Text and CSV rendering of analysis results.

use crate::analysis::AnalysisReport;
use crate::types::SummaryStatistics;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Key statistics block: alpha, beta, correlation and both ranges.
pub fn key_stats(stats: &SummaryStatistics) -> String {
    format!(
        "alpha = {:.3}%\n\
         beta = {:.3}\n\
         correlation = {:.3}\n\
         portfolio range = ({:.2}%, {:.2}%)\n\
         benchmark range = ({:.2}%, {:.2}%)",
        stats.alpha,
        stats.beta,
        stats.correlation,
        stats.portfolio_min,
        stats.portfolio_max,
        stats.benchmark_min,
        stats.benchmark_max,
    )
}

/// Human-readable summary of a run.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Portfolio vs {} from {} ({} business days to {})\n\n",
        report.benchmark_ticker, report.start_date, report.business_days, report.evaluation_date,
    ));

    if let (Some(u), Some(r), Some(t), Some(b)) = (
        report.unrealized.last(),
        report.realized.last(),
        report.total.last(),
        report.benchmark.last(),
    ) {
        out.push_str(&format!("As of {}\n", t.date));
        out.push_str(&format!("  Unrealized P&L:  {:>9.2}%\n", u.value));
        out.push_str(&format!("  Realized P&L:    {:>9.2}%\n", r.value));
        out.push_str(&format!("  Total P&L:       {:>9.2}%\n", t.value));
        out.push_str(&format!("  Benchmark:       {:>9.2}%\n\n", b.value));
    }

    out.push_str("Key Stats\n");
    out.push_str(&key_stats(&report.statistics));
    out.push('\n');

    if report.unapplied_trades > 0 {
        out.push_str(&format!(
            "\n{} trade(s) dated after the last benchmark date are not reflected in the series\n",
            report.unapplied_trades
        ));
    }
    out
}

/// Export the aligned series as CSV: `date,unrealized,realized,total,benchmark`.
pub fn export_series_csv(report: &AnalysisReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "unrealized", "realized", "total", "benchmark"])?;

    let rows = report
        .unrealized
        .points
        .iter()
        .zip(&report.realized.points)
        .zip(&report.total.points)
        .zip(&report.benchmark.points);
    for (((u, r), t), b) in rows {
        wtr.write_record([
            u.date.to_string(),
            format!("{:.6}", u.value),
            format!("{:.6}", r.value),
            format!("{:.6}", t.value),
            format!("{:.6}", b.value),
        ])?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Write the series CSV to `path`, creating parent directories.
pub fn write_series_csv(path: &Path, report: &AnalysisReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, export_series_csv(report)?)?;
    Ok(())
}

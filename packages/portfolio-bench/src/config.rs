//! Analysis configuration loaded from TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default configuration path.
pub const CONFIG_ENV_VAR: &str = "PORTFOLIO_BENCH_CONFIG";

/// Benchmark symbol, initial investment and risk-free return for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Benchmark ticker (uppercase)
    pub benchmark_ticker: String,
    /// Capital the P&L percentages are measured against
    pub initial_investment: f64,
    /// Annual risk-free return in % (e.g. 4.5 for 4.5%)
    pub risk_free_return: f64,
}

/// On-disk layout: everything lives under a `[configuration]` table.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    configuration: AnalysisConfig,
}

impl AnalysisConfig {
    /// Create a configuration. Call [`validate`](Self::validate) before use.
    pub fn new(benchmark_ticker: &str, initial_investment: f64, risk_free_return: f64) -> Self {
        Self {
            benchmark_ticker: benchmark_ticker.trim().to_uppercase(),
            initial_investment,
            risk_free_return,
        }
    }

    /// Get the default configuration file path.
    ///
    /// Default path: `~/.portfolio-bench/config.toml`
    /// Can be overridden with `PORTFOLIO_BENCH_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".portfolio-bench/config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::Configuration(e.to_string()))?;
        let config = Self::new(
            &file.configuration.benchmark_ticker,
            file.configuration.initial_investment,
            file.configuration.risk_free_return,
        );
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML in the on-disk layout.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(&ConfigFile {
            configuration: self.clone(),
        })
        .map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Check the values are usable for an analysis run.
    pub fn validate(&self) -> Result<()> {
        if self.benchmark_ticker.is_empty() {
            return Err(Error::Configuration(
                "benchmark ticker must not be empty".to_string(),
            ));
        }
        if !self.initial_investment.is_finite() || self.initial_investment <= 0.0 {
            return Err(Error::Configuration(format!(
                "initial investment must be positive, got {}",
                self.initial_investment
            )));
        }
        if !self.risk_free_return.is_finite() {
            return Err(Error::Configuration(format!(
                "risk-free return must be finite, got {}",
                self.risk_free_return
            )));
        }
        Ok(())
    }
}

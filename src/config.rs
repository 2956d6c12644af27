//! Configuration types for valuation-bands

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::telemetry::LogFormat;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bands: BandsConfig,
    pub data: DataConfig,
    pub telemetry: TelemetryConfig,
    pub securities: Vec<SecurityConfig>,
}

/// Band computation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BandsConfig {
    /// Trailing business days averaged when smoothing EPS/BPS
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Years of history the PBR quantiles are taken over
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,

    /// Fewest ratio points a quantile may be computed from
    #[serde(default = "default_min_quantile_points")]
    pub min_quantile_points: usize,

    /// PBR quantile bands, lowest first
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<QuantileConfig>,
}

fn default_smoothing_window() -> usize {
    120 // roughly six months of trading days
}
fn default_lookback_years() -> u32 {
    5
}
fn default_min_quantile_points() -> usize {
    2
}
fn default_quantiles() -> Vec<QuantileConfig> {
    vec![
        QuantileConfig::new(10.0, "#FF6B6B"),
        QuantileConfig::new(25.0, "#FFB347"),
        QuantileConfig::new(50.0, "#87CEEB"),
        QuantileConfig::new(75.0, "#77DD77"),
        QuantileConfig::new(90.0, "#DDA0DD"),
    ]
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            smoothing_window: default_smoothing_window(),
            lookback_years: default_lookback_years(),
            min_quantile_points: default_min_quantile_points(),
            quantiles: default_quantiles(),
        }
    }
}

/// One PBR quantile band
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuantileConfig {
    /// Percentile in (0, 100)
    pub quantile: f64,
    /// Line color as `#RRGGBB`
    pub color: String,
}

impl QuantileConfig {
    pub fn new(quantile: f64, color: impl Into<String>) -> Self {
        Self {
            quantile,
            color: color.into(),
        }
    }
}

/// One fixed PER multiple
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerMultipleConfig {
    pub multiple: Decimal,
    pub color: String,
}

impl PerMultipleConfig {
    pub fn new(multiple: Decimal, color: impl Into<String>) -> Self {
        Self {
            multiple,
            color: color.into(),
        }
    }
}

/// Static per-security record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Exchange ticker, also the input file stem
    pub ticker: String,
    /// Display name used in chart titles
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    /// Output file prefix, e.g. `samsung`
    pub slug: String,
    pub per_multiples: Vec<PerMultipleConfig>,
}

/// Input and output locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory holding `{ticker}.parquet` observation tables
    pub input_dir: PathBuf,
    /// Directory chart datasets are published to
    pub output_dir: PathBuf,
    /// Offset applied to the generated-at timestamp (KST by default)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_utc_offset_hours() -> i32 {
    9
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus text file written at the end of each run
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no securities configured")]
    NoSecurities,
    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
    #[error("smoothing window must be at least 1")]
    ZeroWindow,
    #[error("quantile {0} outside (0, 100)")]
    QuantileOutOfRange(f64),
    #[error("{ticker}: PER multiple {multiple} must be positive")]
    NonPositiveMultiple { ticker: String, multiple: Decimal },
    #[error("{0}: no PER multiples configured")]
    NoMultiples(String),
    #[error("utc offset {0}h outside -12..=14")]
    UtcOffsetOutOfRange(i32),
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Configuration embedded from `config.toml.example`
    pub fn embedded() -> anyhow::Result<Self> {
        Ok(toml::from_str(include_str!("../config.toml.example"))?)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.securities.is_empty() {
            return Err(ConfigError::NoSecurities);
        }
        if self.bands.smoothing_window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if let Some(q) = self
            .bands
            .quantiles
            .iter()
            .map(|q| q.quantile)
            .find(|q| !(*q > 0.0 && *q < 100.0))
        {
            return Err(ConfigError::QuantileOutOfRange(q));
        }
        if !(-12..=14).contains(&self.data.utc_offset_hours) {
            return Err(ConfigError::UtcOffsetOutOfRange(self.data.utc_offset_hours));
        }

        let mut seen = HashSet::new();
        for security in &self.securities {
            if !seen.insert(security.ticker.as_str()) {
                return Err(ConfigError::DuplicateTicker(security.ticker.clone()));
            }
            if security.per_multiples.is_empty() {
                return Err(ConfigError::NoMultiples(security.ticker.clone()));
            }
            if let Some(m) = security
                .per_multiples
                .iter()
                .find(|m| m.multiple <= dec!(0))
            {
                return Err(ConfigError::NonPositiveMultiple {
                    ticker: security.ticker.clone(),
                    multiple: m.multiple,
                });
            }
        }
        Ok(())
    }

    /// Look up a configured security by ticker
    pub fn security(&self, ticker: &str) -> Option<&SecurityConfig> {
        self.securities.iter().find(|s| s.ticker == ticker)
    }
}

//! Band calculation types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Band calculation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BandError {
    /// Malformed input: unsorted or duplicate dates, bad close, bad parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Not enough history for the requested window or lookback
    #[error("Insufficient data for {what}: need {required}, have {available}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        available: usize,
    },
}

impl BandError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, BandError::InsufficientData { .. })
    }
}

/// One trading day for a security
///
/// `eps` and `bps` are NaN when the source did not report them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub close: f64,
    pub eps: f64,
    pub bps: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, close: f64, eps: f64, bps: f64) -> Self {
        Self {
            date,
            close,
            eps,
            bps,
        }
    }
}

/// A single dated value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Valuation metric a band is drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    /// Price / earnings per share
    Per,
    /// Price / book value per share
    Pbr,
}

impl Metric {
    /// Lowercase form used in file names
    pub fn file_stem(&self) -> &'static str {
        match self {
            Metric::Per => "per",
            Metric::Pbr => "pbr",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Per => write!(f, "PER"),
            Metric::Pbr => write!(f, "PBR"),
        }
    }
}

/// A named reference line plotted alongside price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandLine {
    /// Series name, e.g. `PER 8x` or `PBR 25%`
    pub name: String,
    /// Legend label, e.g. `PER 8.0x (8x)`
    pub label: String,
    pub metric: Metric,
    /// Multiple applied to the smoothed base series
    pub multiple: f64,
    /// Percentile the multiple was taken at (PBR bands only)
    pub quantile: Option<f64>,
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

impl BandLine {
    /// Value on the most recent date
    pub fn latest(&self) -> Option<SeriesPoint> {
        self.points.last().copied()
    }
}

/// Everything a renderer needs for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    pub ticker: String,
    pub metric: Metric,
    /// Unsmoothed close price
    pub close: Vec<SeriesPoint>,
    /// Sorted ascending by multiple
    pub bands: Vec<BandLine>,
}

impl BandSet {
    pub fn latest_close(&self) -> Option<SeriesPoint> {
        self.close.last().copied()
    }

    pub fn band(&self, name: &str) -> Option<&BandLine> {
        self.bands.iter().find(|b| b.name == name)
    }
}

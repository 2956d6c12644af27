//! JSON sidecars describing published chart datasets

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::parquet::{replace_atomically, CLOSE_SERIES};
use crate::band::{BandSet, Metric};
use crate::config::SecurityConfig;

/// Color of the unsmoothed price line
pub const CLOSE_COLOR: &str = "#FFFFFF";

/// Rendering hints for one series in a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesManifest {
    pub name: String,
    pub label: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantile: Option<f64>,
}

/// The "current" annotation at the right edge of the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestAnnotation {
    pub date: NaiveDate,
    pub close: f64,
    /// Current PER or PBR from the latest reported fundamentals
    pub multiple: Option<f64>,
}

/// Everything a renderer needs besides the rows themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartManifest {
    pub ticker: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    pub metric: Metric,
    pub title: String,
    pub generated_at: DateTime<FixedOffset>,
    /// File name of the Parquet dataset in the same directory
    pub dataset: String,
    pub latest: Option<LatestAnnotation>,
    /// Close first, then bands lowest to highest
    pub series: Vec<SeriesManifest>,
}

impl ChartManifest {
    pub fn new(
        security: &SecurityConfig,
        set: &BandSet,
        current_multiple: Option<f64>,
        generated_at: DateTime<FixedOffset>,
        dataset: impl Into<String>,
    ) -> Self {
        let close = SeriesManifest {
            name: CLOSE_SERIES.to_string(),
            label: format!("{} close", security.name),
            color: CLOSE_COLOR.to_string(),
            multiple: None,
            quantile: None,
        };
        let bands = set.bands.iter().map(|b| SeriesManifest {
            name: b.name.clone(),
            label: b.label.clone(),
            color: b.color.clone(),
            multiple: Some(b.multiple),
            quantile: b.quantile,
        });

        Self {
            ticker: security.ticker.clone(),
            name: security.name.clone(),
            name_en: security.name_en.clone(),
            metric: set.metric,
            title: format!("{} {} band", security.name, set.metric),
            generated_at,
            dataset: dataset.into(),
            latest: set.latest_close().map(|p| LatestAnnotation {
                date: p.date,
                close: p.value,
                multiple: current_multiple,
            }),
            series: std::iter::once(close).chain(bands).collect(),
        }
    }
}

/// Serialize `value` as pretty JSON, replacing `path` atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    replace_atomically(path, |tmp| {
        std::fs::write(tmp, &bytes)?;
        Ok(())
    })
}

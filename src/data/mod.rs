//! Observation store
//!
//! Reads the per-ticker observation tables an upstream fetcher leaves on disk
//! and publishes chart datasets for the renderer.

mod manifest;
mod parquet;
mod sanitize;

pub use manifest::{write_json, ChartManifest, LatestAnnotation, SeriesManifest, CLOSE_COLOR};
pub use parquet::{
    chart_rows, chart_schema, observation_schema, read_chart, write_chart, write_observations,
    ChartRow, ObservationReader, CLOSE_SERIES,
};
pub use sanitize::{sanitize, SanitizeStats};

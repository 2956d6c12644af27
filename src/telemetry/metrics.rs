//! Run metrics

use std::time::Duration;

/// Counter metric types, labelled by ticker
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Securities whose bands were computed
    SecuritiesComputed,
    /// Securities skipped for missing or insufficient data
    SecuritiesSkipped,
    /// Band lines produced
    BandLines,
    /// Chart datasets published
    ChartsPublished,
    /// Fundamentals masked as unreported
    ValuesMasked,
    /// Rows dropped for having no close
    RowsDropped,
}

/// Gauge metric types, labelled by ticker
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest close
    LatestClose,
    /// Close over latest reported EPS
    CurrentPer,
    /// Close over latest reported BPS
    CurrentPbr,
}

impl CounterMetric {
    pub fn name(&self) -> &'static str {
        match self {
            CounterMetric::SecuritiesComputed => "valuation_bands_securities_computed_total",
            CounterMetric::SecuritiesSkipped => "valuation_bands_securities_skipped_total",
            CounterMetric::BandLines => "valuation_bands_band_lines_total",
            CounterMetric::ChartsPublished => "valuation_bands_charts_published_total",
            CounterMetric::ValuesMasked => "valuation_bands_values_masked_total",
            CounterMetric::RowsDropped => "valuation_bands_rows_dropped_total",
        }
    }
}

impl GaugeMetric {
    pub fn name(&self) -> &'static str {
        match self {
            GaugeMetric::LatestClose => "valuation_bands_latest_close",
            GaugeMetric::CurrentPer => "valuation_bands_current_per",
            GaugeMetric::CurrentPbr => "valuation_bands_current_pbr",
        }
    }
}

/// Add to a counter
pub fn increment(metric: CounterMetric, ticker: &str, value: u64) {
    let name = metric.name();
    metrics::counter!(name, "ticker" => ticker.to_string()).increment(value);
    tracing::trace!(metric = name, ticker, value, "Incremented counter");
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, ticker: &str, value: f64) {
    let name = metric.name();
    metrics::gauge!(name, "ticker" => ticker.to_string()).set(value);
    tracing::trace!(metric = name, ticker, value, "Setting gauge");
}

/// Record how long a pipeline run took
pub fn record_run_duration(duration: Duration) {
    metrics::histogram!("valuation_bands_run_duration_seconds").record(duration.as_secs_f64());
    tracing::debug!(
        metric = "valuation_bands_run_duration_seconds",
        value_ms = duration.as_millis() as u64,
        "Recording run duration"
    );
}

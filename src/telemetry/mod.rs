//! Telemetry module
//!
//! Logging and run metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{increment, record_run_duration, set_gauge, CounterMetric, GaugeMetric};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::PathBuf;

use crate::config::TelemetryConfig;

/// Holds the metrics recorder for the length of a run
pub struct TelemetryGuard {
    metrics: Option<(PrometheusHandle, PathBuf)>,
}

impl TelemetryGuard {
    /// Write the Prometheus text snapshot, if a metrics path is configured
    pub fn finish(self) -> anyhow::Result<()> {
        if let Some((handle, path)) = self.metrics {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, handle.render())?;
            tracing::info!(path = ?path, "Wrote metrics snapshot");
        }
        Ok(())
    }
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, config.log_format)?;

    let metrics = match &config.metrics_path {
        Some(path) => {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            ::metrics::set_global_recorder(recorder)
                .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;
            Some((handle, path.clone()))
        }
        None => None,
    };

    Ok(TelemetryGuard { metrics })
}

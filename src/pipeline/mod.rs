//! Batch pipeline
//!
//! One pass over every configured security: load, sanitize, compute bands,
//! then publish. Publishing happens only after every security has been
//! computed, so a malformed input aborts the run without touching the
//! previously published charts.

mod report;

pub use report::{group_thousands, BandPosition, BandReading, MetricSummary, ValuationSummary};

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::band::{BandCalculator, BandError, BandSet, Metric, Observation};
use crate::config::{Config, SecurityConfig};
use crate::data::{self, ChartManifest, ObservationReader};
use crate::telemetry::{self, CounterMetric, GaugeMetric};

/// Bands and summary for one security
#[derive(Debug, Clone)]
pub struct ComputedSecurity {
    pub security: SecurityConfig,
    pub per: BandSet,
    pub pbr: BandSet,
    pub summary: ValuationSummary,
}

/// A security left out of this run, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSecurity {
    pub ticker: String,
    pub reason: String,
}

/// Result of the compute phase
#[derive(Debug, Clone, Default)]
pub struct Computation {
    pub computed: Vec<ComputedSecurity>,
    pub skipped: Vec<SkippedSecurity>,
}

/// A published dataset and its manifest
#[derive(Debug, Clone, Serialize)]
pub struct PublishedChart {
    pub ticker: String,
    pub metric: Metric,
    pub dataset: PathBuf,
    pub manifest: PathBuf,
    pub rows: usize,
}

/// Written to `run.json` after each successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub generated_at: DateTime<FixedOffset>,
    pub published: Vec<PublishedChart>,
    pub skipped: Vec<SkippedSecurity>,
}

/// File name of the run manifest in the output directory
pub const RUN_MANIFEST: &str = "run.json";

pub struct Pipeline {
    config: Config,
    calculator: BandCalculator,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let calculator = BandCalculator::from_config(&config.bands);
        Self { config, calculator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn input_path(&self, security: &SecurityConfig) -> PathBuf {
        self.config
            .data
            .input_dir
            .join(format!("{}.parquet", security.ticker))
    }

    /// Read and sanitize a security's observations; `None` if there is no file
    pub fn load(&self, security: &SecurityConfig) -> anyhow::Result<Option<Vec<Observation>>> {
        let path = self.input_path(security);
        if !path.exists() {
            return Ok(None);
        }

        let raw = ObservationReader::new(path.clone())
            .read()
            .with_context(|| format!("Failed to read observations from {}", path.display()))?;
        let (observations, stats) = data::sanitize(raw);

        if stats.dropped_rows > 0 || stats.masked() > 0 {
            tracing::debug!(
                ticker = %security.ticker,
                dropped_rows = stats.dropped_rows,
                masked_eps = stats.masked_eps,
                masked_bps = stats.masked_bps,
                "Sanitized observations"
            );
        }
        telemetry::increment(
            CounterMetric::RowsDropped,
            &security.ticker,
            stats.dropped_rows as u64,
        );
        telemetry::increment(CounterMetric::ValuesMasked, &security.ticker, stats.masked() as u64);

        Ok(Some(observations))
    }

    /// Bands and summary for one security's observations
    pub fn compute_security(
        &self,
        security: &SecurityConfig,
        observations: &[Observation],
    ) -> Result<ComputedSecurity, BandError> {
        let (per, pbr) = self
            .calculator
            .band_sets(observations, security, &self.config.bands.quantiles)?;
        let summary = ValuationSummary::from_band_sets(security, observations, &per, &pbr).ok_or(
            BandError::InsufficientData {
                what: "valuation summary",
                required: 1,
                available: 0,
            },
        )?;

        Ok(ComputedSecurity {
            security: security.clone(),
            per,
            pbr,
            summary,
        })
    }

    /// Compute every configured security
    ///
    /// Missing input and insufficient history skip the security. Invalid
    /// input fails the whole computation.
    pub fn compute(&self) -> anyhow::Result<Computation> {
        let mut computation = Computation::default();

        for security in &self.config.securities {
            let skip = |reason: String| {
                tracing::warn!(ticker = %security.ticker, %reason, "Skipping security");
                telemetry::increment(CounterMetric::SecuritiesSkipped, &security.ticker, 1);
                SkippedSecurity {
                    ticker: security.ticker.clone(),
                    reason,
                }
            };

            let Some(observations) = self.load(security)? else {
                let reason = format!("no input at {}", self.input_path(security).display());
                computation.skipped.push(skip(reason));
                continue;
            };

            if let (Some(first), Some(last)) = (observations.first(), observations.last()) {
                tracing::info!(
                    ticker = %security.ticker,
                    name = %security.name,
                    count = observations.len(),
                    from = %first.date,
                    to = %last.date,
                    "Loaded observations"
                );
            }

            match self.compute_security(security, &observations) {
                Ok(computed) => {
                    let summary = &computed.summary;
                    tracing::info!(
                        ticker = %security.ticker,
                        close = summary.close,
                        per = ?summary.per.current,
                        pbr = ?summary.pbr.current,
                        "Computed bands"
                    );
                    record_summary(summary);
                    telemetry::increment(CounterMetric::SecuritiesComputed, &security.ticker, 1);
                    telemetry::increment(
                        CounterMetric::BandLines,
                        &security.ticker,
                        (computed.per.bands.len() + computed.pbr.bands.len()) as u64,
                    );
                    computation.computed.push(computed);
                }
                Err(e) if e.is_insufficient_data() => {
                    computation.skipped.push(skip(e.to_string()));
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Invalid observations for {}", security.ticker)));
                }
            }
        }

        Ok(computation)
    }

    /// Write chart datasets, manifests and the run manifest
    pub fn publish(
        &self,
        computation: &Computation,
        run_id: Uuid,
        generated_at: DateTime<FixedOffset>,
    ) -> anyhow::Result<RunManifest> {
        let output_dir = &self.config.data.output_dir;
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let mut published = Vec::new();
        for computed in &computation.computed {
            let charts = [
                (&computed.per, computed.summary.per.current),
                (&computed.pbr, computed.summary.pbr.current),
            ];
            for (set, current) in charts {
                let stem = format!("{}_{}_band", computed.security.slug, set.metric.file_stem());
                let dataset = output_dir.join(format!("{}.parquet", stem));
                let manifest_path = output_dir.join(format!("{}.json", stem));

                let rows = data::write_chart(&dataset, set)?;
                let manifest = ChartManifest::new(
                    &computed.security,
                    set,
                    current,
                    generated_at,
                    format!("{}.parquet", stem),
                );
                data::write_json(&manifest_path, &manifest)?;

                tracing::info!(
                    ticker = %set.ticker,
                    metric = %set.metric,
                    path = ?dataset,
                    rows,
                    "Published chart dataset"
                );
                telemetry::increment(CounterMetric::ChartsPublished, &set.ticker, 1);

                published.push(PublishedChart {
                    ticker: set.ticker.clone(),
                    metric: set.metric,
                    dataset,
                    manifest: manifest_path,
                    rows,
                });
            }
        }

        let manifest = RunManifest {
            run_id,
            generated_at,
            published,
            skipped: computation.skipped.clone(),
        };
        data::write_json(&output_dir.join(RUN_MANIFEST), &manifest)?;
        Ok(manifest)
    }

    /// One full pass: compute everything, then publish
    pub fn run(&self) -> anyhow::Result<RunManifest> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        let _enter = span.enter();
        let started = Instant::now();

        let computation = self.compute()?;
        let manifest = self.publish(&computation, run_id, self.now()?)?;

        telemetry::record_run_duration(started.elapsed());
        tracing::info!(
            published = manifest.published.len(),
            skipped = manifest.skipped.len(),
            "Run complete"
        );
        Ok(manifest)
    }

    /// Summaries for every security that can be computed, without publishing
    pub fn summaries(&self) -> anyhow::Result<Vec<ValuationSummary>> {
        Ok(self
            .compute()?
            .computed
            .into_iter()
            .map(|c| c.summary)
            .collect())
    }

    fn now(&self) -> anyhow::Result<DateTime<FixedOffset>> {
        let hours = self.config.data.utc_offset_hours;
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {}h", hours))?;
        Ok(Utc::now().with_timezone(&offset))
    }
}

fn record_summary(summary: &ValuationSummary) {
    telemetry::set_gauge(GaugeMetric::LatestClose, &summary.ticker, summary.close);
    if let Some(per) = summary.per.current {
        telemetry::set_gauge(GaugeMetric::CurrentPer, &summary.ticker, per);
    }
    if let Some(pbr) = summary.pbr.current {
        telemetry::set_gauge(GaugeMetric::CurrentPbr, &summary.ticker, pbr);
    }
}

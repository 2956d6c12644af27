//! PER and PBR band construction

use std::collections::BTreeMap;

use chrono::Months;
use rust_decimal::prelude::ToPrimitive;

use super::quantile::quantiles;
use super::smoothing::smooth;
use super::{BandError, BandLine, BandSet, Metric, Observation, SeriesPoint};
use crate::config::{BandsConfig, PerMultipleConfig, QuantileConfig, SecurityConfig};

/// Computes band lines from one security's observations
#[derive(Debug, Clone)]
pub struct BandCalculator {
    window: usize,
    lookback_years: u32,
    min_quantile_points: usize,
}

impl BandCalculator {
    pub fn new(window: usize, lookback_years: u32, min_quantile_points: usize) -> Self {
        Self {
            window,
            lookback_years,
            min_quantile_points,
        }
    }

    pub fn from_config(config: &BandsConfig) -> Self {
        Self::new(
            config.smoothing_window,
            config.lookback_years,
            config.min_quantile_points,
        )
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Check dates strictly ascend and every close is a positive number
    pub fn validate(observations: &[Observation]) -> Result<(), BandError> {
        if let Some(bad) = observations
            .iter()
            .find(|o| !o.close.is_finite() || o.close <= 0.0)
        {
            return Err(BandError::InvalidInput(format!(
                "close {} on {} is not a positive price",
                bad.close, bad.date
            )));
        }
        for pair in observations.windows(2) {
            let (prev, curr) = (pair[0].date, pair[1].date);
            if curr == prev {
                return Err(BandError::InvalidInput(format!("duplicate date {}", curr)));
            }
            if curr < prev {
                return Err(BandError::InvalidInput(format!(
                    "date {} follows {}, series must be ascending",
                    curr, prev
                )));
            }
        }
        Ok(())
    }

    /// One band per multiple: smoothed EPS times the multiple
    pub fn per_bands(
        &self,
        observations: &[Observation],
        multiples: &[PerMultipleConfig],
    ) -> Result<Vec<BandLine>, BandError> {
        Self::validate(observations)?;
        self.per_lines(observations, multiples)
    }

    /// One band per quantile of the trailing PBR distribution, applied to
    /// smoothed BPS
    ///
    /// The quantile multiples are fixed over the lookback window ending on
    /// the latest date and held constant across the whole chart span.
    pub fn pbr_bands(
        &self,
        observations: &[Observation],
        quantiles: &[QuantileConfig],
    ) -> Result<Vec<BandLine>, BandError> {
        Self::validate(observations)?;
        self.pbr_lines(observations, quantiles)
    }

    /// close / smoothed BPS over the trailing lookback window
    ///
    /// The window start is clamped to the first smoothed date when history is
    /// shorter than the lookback.
    pub fn pbr_ratios(&self, observations: &[Observation]) -> Result<Vec<SeriesPoint>, BandError> {
        Self::validate(observations)?;
        let smoothed_bps = self.smoothed(observations, |o| o.bps, "BPS smoothing window")?;
        Ok(self.ratio_window(observations, &smoothed_bps))
    }

    /// PER and PBR band sets for a security, validating once
    pub fn band_sets(
        &self,
        observations: &[Observation],
        security: &SecurityConfig,
        quantiles: &[QuantileConfig],
    ) -> Result<(BandSet, BandSet), BandError> {
        Self::validate(observations)?;

        let per = self.per_lines(observations, &security.per_multiples)?;
        let pbr = self.pbr_lines(observations, quantiles)?;

        Ok((
            band_set(&security.ticker, Metric::Per, observations, per),
            band_set(&security.ticker, Metric::Pbr, observations, pbr),
        ))
    }

    fn smoothed(
        &self,
        observations: &[Observation],
        field: impl Fn(&Observation) -> f64,
        what: &'static str,
    ) -> Result<Vec<SeriesPoint>, BandError> {
        if observations.len() < self.window {
            return Err(BandError::InsufficientData {
                what,
                required: self.window,
                available: observations.len(),
            });
        }

        let raw: Vec<SeriesPoint> = observations
            .iter()
            .map(|o| SeriesPoint::new(o.date, field(o)))
            .collect();
        let smoothed = smooth(&raw, self.window)?;
        if smoothed.len() == 0 {
            return Err(BandError::InsufficientData {
                what,
                required: self.window,
                available: smoothed.reported_len(),
            });
        }
        Ok(smoothed.collect())
    }

    fn per_lines(
        &self,
        observations: &[Observation],
        multiples: &[PerMultipleConfig],
    ) -> Result<Vec<BandLine>, BandError> {
        let smoothed_eps = self.smoothed(observations, |o| o.eps, "EPS smoothing window")?;

        let mut lines = multiples
            .iter()
            .map(|m| {
                let multiple = m.multiple.to_f64().ok_or_else(|| {
                    BandError::InvalidInput(format!("multiple {} is not representable", m.multiple))
                })?;
                let shown = m.multiple.normalize();
                Ok(BandLine {
                    name: format!("PER {}x", shown),
                    label: format!("PER {:.1}x ({}x)", multiple, shown),
                    metric: Metric::Per,
                    multiple,
                    quantile: None,
                    color: m.color.clone(),
                    points: scaled(&smoothed_eps, multiple),
                })
            })
            .collect::<Result<Vec<_>, BandError>>()?;

        lines.sort_by(|a, b| a.multiple.total_cmp(&b.multiple));
        Ok(lines)
    }

    fn pbr_lines(
        &self,
        observations: &[Observation],
        bands: &[QuantileConfig],
    ) -> Result<Vec<BandLine>, BandError> {
        if let Some(bad) = bands.iter().find(|q| !(0.0..=100.0).contains(&q.quantile)) {
            return Err(BandError::InvalidInput(format!(
                "quantile {} outside 0..=100",
                bad.quantile
            )));
        }

        // book value at or below zero has no meaningful price multiple
        let mut smoothed_bps = self.smoothed(observations, |o| o.bps, "BPS smoothing window")?;
        smoothed_bps.retain(|p| p.value > 0.0);
        let ratios = self.ratio_window(observations, &smoothed_bps);
        if ratios.len() < self.min_quantile_points.max(1) {
            return Err(BandError::InsufficientData {
                what: "PBR lookback window",
                required: self.min_quantile_points.max(1),
                available: ratios.len(),
            });
        }

        let values: Vec<f64> = ratios.iter().map(|p| p.value).collect();
        let pcts: Vec<f64> = bands.iter().map(|q| q.quantile).collect();
        let multiples = quantiles(&values, &pcts).ok_or(BandError::InsufficientData {
            what: "PBR lookback window",
            required: 1,
            available: 0,
        })?;

        tracing::debug!(
            ratio_points = ratios.len(),
            from = %ratios[0].date,
            to = %ratios[ratios.len() - 1].date,
            "Computed PBR quantile multiples"
        );

        let mut lines: Vec<BandLine> = bands
            .iter()
            .zip(multiples)
            .map(|(q, multiple)| BandLine {
                name: format!("PBR {}%", q.quantile),
                label: format!("PBR {:.2}x ({}%)", multiple, q.quantile),
                metric: Metric::Pbr,
                multiple,
                quantile: Some(q.quantile),
                color: q.color.clone(),
                points: scaled(&smoothed_bps, multiple),
            })
            .collect();

        lines.sort_by(|a, b| a.multiple.total_cmp(&b.multiple));
        Ok(lines)
    }

    fn ratio_window(
        &self,
        observations: &[Observation],
        smoothed_bps: &[SeriesPoint],
    ) -> Vec<SeriesPoint> {
        let Some(latest) = observations.last().map(|o| o.date) else {
            return Vec::new();
        };
        let start = latest
            .checked_sub_months(Months::new(12 * self.lookback_years))
            .unwrap_or(chrono::NaiveDate::MIN);

        let closes: BTreeMap<_, _> = observations.iter().map(|o| (o.date, o.close)).collect();

        smoothed_bps
            .iter()
            .filter(|p| p.date >= start && p.value > 0.0)
            .filter_map(|p| {
                closes
                    .get(&p.date)
                    .map(|close| SeriesPoint::new(p.date, close / p.value))
            })
            .collect()
    }
}

impl Default for BandCalculator {
    fn default() -> Self {
        Self::from_config(&BandsConfig::default())
    }
}

fn scaled(series: &[SeriesPoint], multiple: f64) -> Vec<SeriesPoint> {
    series
        .iter()
        .map(|p| SeriesPoint::new(p.date, p.value * multiple))
        .collect()
}

fn band_set(
    ticker: &str,
    metric: Metric,
    observations: &[Observation],
    bands: Vec<BandLine>,
) -> BandSet {
    BandSet {
        ticker: ticker.to_string(),
        metric,
        close: observations
            .iter()
            .map(|o| SeriesPoint::new(o.date, o.close))
            .collect(),
        bands,
    }
}

//! Cleanup of raw exchange observations
//!
//! The exchange reports a zero EPS/BPS (and therefore a zero PER/PBR) on days
//! it has no fundamentals for. Those zeros are markers, not values.

use crate::band::Observation;

/// What [`sanitize`] changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    /// Rows dropped because the close was zero or missing
    pub dropped_rows: usize,
    /// EPS values replaced with NaN
    pub masked_eps: usize,
    /// BPS values replaced with NaN
    pub masked_bps: usize,
}

impl SanitizeStats {
    pub fn masked(&self) -> usize {
        self.masked_eps + self.masked_bps
    }
}

/// Mask unreported fundamentals and drop non-trading rows
///
/// Non-positive EPS/BPS become NaN so smoothing skips them; the close series
/// is kept intact. Rows with no usable close carry nothing to plot.
pub fn sanitize(observations: Vec<Observation>) -> (Vec<Observation>, SanitizeStats) {
    let mut stats = SanitizeStats::default();
    let reported = |v: f64| v.is_finite() && v > 0.0;

    let mut cleaned = Vec::with_capacity(observations.len());

    for mut o in observations {
        if o.close == 0.0 || o.close.is_nan() {
            stats.dropped_rows += 1;
            continue;
        }
        if !o.eps.is_nan() && !reported(o.eps) {
            o.eps = f64::NAN;
            stats.masked_eps += 1;
        }
        if !o.bps.is_nan() && !reported(o.bps) {
            o.bps = f64::NAN;
            stats.masked_bps += 1;
        }
        cleaned.push(o);
    }

    (cleaned, stats)
}

//! Percentiles with linear interpolation between order statistics

/// Finite values sorted ascending
fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    finite.sort_by(f64::total_cmp);
    finite
}

/// Interpolated value at percentile `pct` of an already sorted slice
fn interpolate(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() || !pct.is_finite() {
        return None;
    }
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        Some(sorted[lower])
    } else {
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64))
    }
}

/// The `pct`-th percentile (0..=100) of the finite values
///
/// rank = pct / 100 * (n - 1), interpolated between the floor and ceil
/// ranks. Returns `None` when there are no finite values or `pct` is not
/// itself finite.
pub fn quantile(values: &[f64], pct: f64) -> Option<f64> {
    interpolate(&sorted_finite(values), pct)
}

/// Several percentiles over one sort of `values`
pub fn quantiles(values: &[f64], pcts: &[f64]) -> Option<Vec<f64>> {
    let sorted = sorted_finite(values);
    pcts.iter().map(|p| interpolate(&sorted, *p)).collect()
}

//! Trailing moving average over reported values
//!
//! EPS and BPS change in steps when quarterly results are released. The
//! trailing mean turns those steps into a ramp so band lines stay readable.

use super::{BandError, SeriesPoint};

/// Lazy trailing-window mean over the finite values of a series
///
/// Non-finite points are dropped before windowing: they produce no output
/// and do not count toward `window`. The first output lands on the
/// `window`-th reported value.
#[derive(Debug, Clone)]
pub struct Smoothed {
    reported: Vec<SeriesPoint>,
    window: usize,
    next: usize,
}

impl Smoothed {
    /// Number of finite points the average is taken over
    pub fn reported_len(&self) -> usize {
        self.reported.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Iterator for Smoothed {
    type Item = SeriesPoint;

    fn next(&mut self) -> Option<SeriesPoint> {
        if self.next >= self.reported.len() {
            return None;
        }
        let end = self.next + 1;
        let slice = &self.reported[end - self.window..end];
        self.next = end;

        // Mean of offsets from the first value keeps flat runs exact
        let base = slice[0].value;
        let offset = slice.iter().map(|p| p.value - base).sum::<f64>() / self.window as f64;

        Some(SeriesPoint::new(slice[slice.len() - 1].date, base + offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reported.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Smoothed {}

/// Smooth `series` with a trailing mean of `window` reported values
pub fn smooth(series: &[SeriesPoint], window: usize) -> Result<Smoothed, BandError> {
    if window == 0 {
        return Err(BandError::InvalidInput(
            "smoothing window must be at least 1".to_string(),
        ));
    }

    let reported: Vec<SeriesPoint> = series
        .iter()
        .copied()
        .filter(|p| p.value.is_finite())
        .collect();

    Ok(Smoothed {
        reported,
        window,
        next: window - 1,
    })
}

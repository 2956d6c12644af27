//! Valuation band calculator
//!
//! Turns a security's daily (close, EPS, BPS) history into band lines:
//! - PER bands: smoothed EPS times each fixed multiple
//! - PBR bands: smoothed BPS times quantiles of the trailing PBR distribution
//!
//! Everything here is a pure function over an immutable slice of
//! observations.

mod calculator;
mod quantile;
mod smoothing;
mod types;

pub use calculator::BandCalculator;
pub use quantile::{quantile, quantiles};
pub use smoothing::{smooth, Smoothed};
pub use types::{BandError, BandLine, BandSet, Metric, Observation, SeriesPoint};

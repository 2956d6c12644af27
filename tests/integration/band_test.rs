//! Band calculator scenarios over realistic business-day calendars

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal_macros::dec;
use valuation_bands::band::{quantile, smooth, BandCalculator, BandError, Observation, SeriesPoint};
use valuation_bands::config::{BandsConfig, PerMultipleConfig, QuantileConfig};

fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut day = start;
    let mut days = Vec::with_capacity(n);
    while days.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

fn multiples(values: &[rust_decimal::Decimal]) -> Vec<PerMultipleConfig> {
    values
        .iter()
        .map(|m| PerMultipleConfig::new(*m, "#FFFFFF"))
        .collect()
}

#[test]
fn test_per_bands_130_days_constant_eps() {
    let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let observations: Vec<Observation> = business_days(start, 130)
        .into_iter()
        .map(|d| Observation::new(d, 55_000.0, 1000.0, 50_000.0))
        .collect();

    let lines = BandCalculator::default()
        .per_bands(
            &observations,
            &multiples(&[dec!(8), dec!(10), dec!(12), dec!(15), dec!(20)]),
        )
        .unwrap();

    let expected = [8000.0, 10000.0, 12000.0, 15000.0, 20000.0];
    assert_eq!(lines.len(), 5);
    for (line, value) in lines.iter().zip(expected) {
        let dates: Vec<NaiveDate> = line.points.iter().map(|p| p.date).collect();
        let tail: Vec<NaiveDate> = observations[119..].iter().map(|o| o.date).collect();
        assert_eq!(dates, tail);
        assert!(line.points.iter().all(|p| p.value == value));
    }
}

#[test]
fn test_per_bands_any_short_series_fails() {
    let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    for n in [0, 1, 60, 119] {
        let observations: Vec<Observation> = business_days(start, n)
            .into_iter()
            .map(|d| Observation::new(d, 55_000.0, 1000.0, 50_000.0))
            .collect();
        let result = BandCalculator::default().per_bands(&observations, &multiples(&[dec!(10)]));
        assert!(matches!(result, Err(BandError::InsufficientData { .. })), "n = {}", n);
    }
}

#[test]
fn test_quarterly_steps_are_smoothed() {
    // EPS steps up every 63 business days (one quarter)
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let days = business_days(start, 252);
    let series: Vec<SeriesPoint> = days
        .iter()
        .enumerate()
        .map(|(i, d)| SeriesPoint::new(*d, 1000.0 + 100.0 * (i / 63) as f64))
        .collect();

    let smoothed: Vec<SeriesPoint> = smooth(&series, 120).unwrap().collect();
    assert_eq!(smoothed.len(), 133);

    // a window spans at most two steps, so adjacent means differ by at most 200 / 120
    assert!(smoothed
        .windows(2)
        .all(|w| (w[1].value - w[0].value).abs() <= 200.0 / 120.0 + 1e-9));
    assert!(smoothed.windows(2).all(|w| w[1].value >= w[0].value - 1e-9));
}

#[test]
fn test_pbr_quantiles_match_ratio_distribution() {
    let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    let days = business_days(start, 1400);
    let observations: Vec<Observation> = days
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let close = 60_000.0 + 15_000.0 * ((i as f64) / 40.0).sin();
            Observation::new(*d, close, 4_000.0, 50_000.0)
        })
        .collect();

    let calculator = BandCalculator::default();
    let ratios = calculator.pbr_ratios(&observations).unwrap();
    let values: Vec<f64> = ratios.iter().map(|p| p.value).collect();

    let bands = BandsConfig::default().quantiles;
    let lines = calculator.pbr_bands(&observations, &bands).unwrap();
    for (line, band) in lines.iter().zip(&bands) {
        let expected = quantile(&values, band.quantile).unwrap();
        assert!((line.multiple - expected).abs() < 1e-12);
        // flat BPS means every band point is multiple * BPS
        assert!(line
            .points
            .iter()
            .all(|p| (p.value - expected * 50_000.0).abs() < 1e-6));
    }
    assert!(lines.windows(2).all(|w| w[0].multiple <= w[1].multiple));
}

#[test]
fn test_pbr_three_years_with_five_year_lookback() {
    let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
    let observations: Vec<Observation> = business_days(start, 3 * 252)
        .into_iter()
        .enumerate()
        .map(|(i, d)| Observation::new(d, 50_000.0 + i as f64, 4_000.0, 45_000.0))
        .collect();

    let lines = BandCalculator::default()
        .pbr_bands(&observations, &[QuantileConfig::new(50.0, "#87CEEB")])
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].points.len(), 3 * 252 - 119);
}

#[test]
fn test_missing_fundamentals_are_skipped() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let observations: Vec<Observation> = business_days(start, 200)
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let eps = if i % 10 == 0 { f64::NAN } else { 2_000.0 };
            Observation::new(d, 55_000.0, eps, 50_000.0)
        })
        .collect();

    let lines = BandCalculator::default()
        .per_bands(&observations, &multiples(&[dec!(10)]))
        .unwrap();
    // 180 reported values, first smoothed on the 120th of them
    assert_eq!(lines[0].points.len(), 61);
    assert!(lines[0].points.iter().all(|p| p.value == 20_000.0));
}

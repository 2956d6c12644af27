//! End-to-end pipeline tests over Parquet files

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::path::Path;
use tempfile::TempDir;
use valuation_bands::band::{Metric, Observation};
use valuation_bands::config::Config;
use valuation_bands::data::{read_chart, write_observations, CLOSE_SERIES};
use valuation_bands::pipeline::{Pipeline, RUN_MANIFEST};

fn history(n: usize, close: f64, eps: f64, bps: f64) -> Vec<Observation> {
    let mut day = NaiveDate::from_ymd_opt(2021, 3, 2).unwrap();
    let mut observations = Vec::with_capacity(n);
    while observations.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let i = observations.len() as f64;
            observations.push(Observation::new(day, close + 10.0 * i, eps, bps));
        }
        day += Duration::days(1);
    }
    observations
}

fn config(dir: &Path) -> Config {
    let mut config = Config::embedded().unwrap();
    config.data.input_dir = dir.join("input");
    config.data.output_dir = dir.join("charts");
    config
}

#[test]
fn test_run_skips_security_without_eps() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path());
    write_observations(
        &config.data.input_dir.join("005930.parquet"),
        &history(400, 55_000.0, 4_000.0, 50_000.0),
    )
    .unwrap();
    write_observations(
        &config.data.input_dir.join("000660.parquet"),
        &history(400, 180_000.0, 0.0, 120_000.0),
    )
    .unwrap();

    let output_dir = config.data.output_dir.clone();
    let result = Pipeline::new(config).run();

    // SK Hynix has no reported EPS at all, so only Samsung is published
    let manifest = result.unwrap();
    assert_eq!(manifest.published.len(), 2);
    assert!(manifest.published.iter().all(|c| c.ticker == "005930"));
    assert_eq!(manifest.skipped.len(), 1);
    assert_eq!(manifest.skipped[0].ticker, "000660");

    for name in [
        "samsung_per_band.parquet",
        "samsung_per_band.json",
        "samsung_pbr_band.parquet",
        "samsung_pbr_band.json",
        RUN_MANIFEST,
    ] {
        assert!(output_dir.join(name).exists(), "missing {}", name);
    }
    assert!(!output_dir.join("hynix_per_band.parquet").exists());

    let rows = read_chart(&output_dir.join("samsung_per_band.parquet")).unwrap();
    let close_rows = rows.iter().filter(|r| r.series == CLOSE_SERIES).count();
    let band_rows = rows.iter().filter(|r| r.series == "PER 10x").count();
    assert_eq!(close_rows, 400);
    assert_eq!(band_rows, 400 - 119);
    assert!(rows
        .iter()
        .filter(|r| r.series == "PER 10x")
        .all(|r| r.value == 40_000.0));

    let chart: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.join("samsung_pbr_band.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(chart["metric"], "PBR");
    assert_eq!(chart["series"].as_array().unwrap().len(), 6);
    assert_eq!(chart["series"][1]["color"], "#FF6B6B");
}

#[test]
fn test_invalid_input_publishes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path());
    let mut samsung = history(400, 55_000.0, 4_000.0, 50_000.0);
    samsung[200].date = samsung[199].date;
    write_observations(&config.data.input_dir.join("005930.parquet"), &samsung).unwrap();
    write_observations(
        &config.data.input_dir.join("000660.parquet"),
        &history(400, 180_000.0, 9_000.0, 120_000.0),
    )
    .unwrap();

    // previous artifact stays live
    std::fs::create_dir_all(&config.data.output_dir).unwrap();
    let previous = config.data.output_dir.join("hynix_per_band.json");
    std::fs::write(&previous, "{}").unwrap();

    let output_dir = config.data.output_dir.clone();
    let err = Pipeline::new(config).run().unwrap_err();
    assert!(format!("{:#}", err).contains("duplicate date"));
    assert_eq!(std::fs::read_to_string(&previous).unwrap(), "{}");
    assert!(!output_dir.join(RUN_MANIFEST).exists());
}

#[test]
fn test_summaries_without_publishing() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path());
    write_observations(
        &config.data.input_dir.join("000660.parquet"),
        &history(300, 180_000.0, 9_000.0, 120_000.0),
    )
    .unwrap();

    let output_dir = config.data.output_dir.clone();
    let summaries = Pipeline::new(config).summaries().unwrap();

    assert_eq!(summaries.len(), 1);
    let hynix = &summaries[0];
    assert_eq!(hynix.ticker, "000660");
    assert_eq!(hynix.per.metric, Metric::Per);
    assert_eq!(hynix.per.bands.len(), 5);
    assert_eq!(hynix.pbr.bands.len(), 5);
    assert!(hynix.per.position.is_some());
    assert!(!output_dir.exists());
}

//! valuation-bands: PER/PBR valuation band datasets
//!
//! This library provides the components for:
//! - Smoothing step-like EPS/BPS histories with a trailing mean
//! - PER fixed-multiple bands and PBR quantile bands
//! - Reading observation tables and publishing chart datasets to Parquet
//! - A sequential batch pipeline over the configured securities
//! - Structured logging and run metrics

pub mod band;
pub mod cli;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod telemetry;

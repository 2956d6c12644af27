//! CLI interface for valuation-bands
//!
//! Provides subcommands for:
//! - `run`: Compute bands and publish chart datasets
//! - `summary`: Print the current valuation of each security
//! - `config`: Show the effective configuration

mod run;
mod summary;

pub use run::RunArgs;
pub use summary::{OutputFormat, SummaryArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "valuation-bands")]
#[command(about = "PER/PBR valuation band datasets for Korean equities")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute bands and publish chart datasets
    Run(RunArgs),
    /// Print the current valuation of each security
    Summary(SummaryArgs),
    /// Show the effective configuration
    Config,
}

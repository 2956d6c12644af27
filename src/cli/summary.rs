//! Summary command implementation

use clap::{Args, ValueEnum};

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Output format for the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Output format: table or json
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl SummaryArgs {
    pub fn execute(&self, config: Config) -> anyhow::Result<()> {
        let summaries = Pipeline::new(config).summaries()?;

        match self.format {
            OutputFormat::Table => {
                for summary in &summaries {
                    println!("{}", summary.format_table());
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
        }
        Ok(())
    }
}

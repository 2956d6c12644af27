//! Run command implementation

use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::pipeline::Pipeline;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding `{ticker}.parquet` observation tables
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory chart datasets are published to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Apply path overrides on top of the loaded configuration
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.input_dir {
            config.data.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.data.output_dir = dir.clone();
        }
        config
    }

    pub fn execute(&self, config: Config) -> anyhow::Result<()> {
        let pipeline = Pipeline::new(self.apply(config));
        tracing::info!(
            input_dir = ?pipeline.config().data.input_dir,
            output_dir = ?pipeline.config().data.output_dir,
            "Running band pipeline..."
        );

        let manifest = pipeline.run()?;
        for chart in &manifest.published {
            println!("{} {} -> {}", chart.ticker, chart.metric, chart.dataset.display());
        }
        for skipped in &manifest.skipped {
            println!("{} skipped: {}", skipped.ticker, skipped.reason);
        }
        Ok(())
    }
}

use clap::Parser;
use valuation_bands::cli::{Cli, Commands};
use valuation_bands::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::embedded()?
        }
    };
    config.validate()?;

    // Initialize telemetry
    let telemetry = valuation_bands::telemetry::init_telemetry(&config.telemetry)?;

    // Snapshot metrics even when the command fails
    let result = execute(cli.command, config);
    let snapshot = telemetry.finish();
    result?;
    snapshot
}

fn execute(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => {
            tracing::info!("Starting band run");
            args.execute(config)?;
        }
        Commands::Summary(args) => {
            args.execute(config)?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Bands: window={} lookback={}y quantiles={:?}",
                config.bands.smoothing_window,
                config.bands.lookback_years,
                config
                    .bands
                    .quantiles
                    .iter()
                    .map(|q| q.quantile)
                    .collect::<Vec<_>>()
            );
            println!(
                "  Data: {} -> {}",
                config.data.input_dir.display(),
                config.data.output_dir.display()
            );
            for security in &config.securities {
                let multiples: Vec<String> = security
                    .per_multiples
                    .iter()
                    .map(|m| format!("{}x", m.multiple.normalize()))
                    .collect();
                println!(
                    "  {} {} ({}): PER {}",
                    security.ticker,
                    security.name,
                    security.slug,
                    multiples.join(", ")
                );
            }
        }
    }

    Ok(())
}

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratemart::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Execute a full pipeline run
    Run {
        /// Drop the warehouse schema first (destructive)
        #[arg(long)]
        teardown: bool,

        /// Normalize stock and ETF source files before loading
        #[arg(long)]
        format_prices: bool,

        /// Normalize the commodity statistics file before loading
        #[arg(long)]
        format_commodities: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Run {
            teardown,
            format_prices,
            format_commodities,
        }) => {
            let options = ratemart::RunOptions {
                teardown,
                format_price_files: format_prices,
                format_commodities_files: format_commodities,
            };
            ratemart::run_pipeline(options, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Pipeline failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = ratemart::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
api:
  base_url: "https://api.exchangeratesapi.io"

warehouse:
  host: "127.0.0.1"
  port: 5432
  dbname: "warehouse"
  user: "etl"

data_dir: "./data"
start_year: 1999
min_rows: 10
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

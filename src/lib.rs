pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod derive;
pub mod extract;
pub mod formatters;
pub mod load;
pub mod pipeline;
pub mod providers;
pub mod schema;
pub mod store;

use anyhow::Result;
use tracing::{debug, info};

pub use pipeline::{Pipeline, RunOptions, Stage};

/// Runs the full ETL pipeline against the configured warehouse.
pub async fn run_pipeline(options: RunOptions, config_path: Option<&str>) -> Result<()> {
    info!("Warehouse pipeline starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let warehouse = store::PostgresWarehouse::new(&config.warehouse);
    let provider = providers::exchange_api::ExchangeRateApi::new(&config.api.base_url);

    let mut pipeline = Pipeline::new(&config, &warehouse, &provider);
    pipeline.run(options).await
}

//! Pipeline orchestration: stage sequencing and run state

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info};

use crate::checks::QualityGate;
use crate::cli::ui;
use crate::config::AppConfig;
use crate::core::currency::{CURRENCIES, rate_fact_columns};
use crate::core::rates::RateHistoryProvider;
use crate::core::warehouse::Warehouse;
use crate::derive::{DATE_SOURCES, DerivationEngine};
use crate::extract;
use crate::formatters::{commodities, prices};
use crate::load::BulkLoader;
use crate::schema::{self, SchemaManager};

/// Run states. Every transition is unconditional except `TearingDown`,
/// which is gated by [`RunOptions::teardown`]; the first fatal error moves
/// straight to `Failed` and no later stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    TearingDown,
    Initializing,
    Extracting,
    Loading,
    Deriving,
    Validating,
    Succeeded,
    Failed,
}

impl Stage {
    fn banner(&self) -> Option<&'static str> {
        match self {
            Stage::TearingDown => Some("Destroying existing warehouse resources..."),
            Stage::Initializing => Some("Initializing warehouse schema..."),
            Stage::Extracting => Some("Extracting currency exchange rates..."),
            Stage::Loading => Some("Loading warehouse tables..."),
            Stage::Deriving => Some("Deriving date dimension..."),
            Stage::Validating => Some("Checking table integrity..."),
            _ => None,
        }
    }
}

/// Behavior switches for one run. One struct, not separate code paths:
/// every run walks the same stage sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Drop the schema before initializing (destructive).
    pub teardown: bool,
    /// Normalize price source files before loading them.
    pub format_price_files: bool,
    /// Normalize the commodity source file before loading it.
    pub format_commodities_files: bool,
}

/// Sequences the pipeline stages against a warehouse and a rate provider.
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    warehouse: &'a dyn Warehouse,
    rates: &'a dyn RateHistoryProvider,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AppConfig,
        warehouse: &'a dyn Warehouse,
        rates: &'a dyn RateHistoryProvider,
    ) -> Self {
        Pipeline {
            config,
            warehouse,
            rates,
            stage: Stage::Idle,
        }
    }

    /// Current run state; terminal after [`Pipeline::run`] returns.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Executes one full run. Success is reported only after the quality
    /// gate passes; the first stage failure aborts the remainder.
    pub async fn run(&mut self, options: RunOptions) -> Result<()> {
        let result = self.execute(options).await;
        match &result {
            Ok(()) => {
                self.stage = Stage::Succeeded;
                info!("Pipeline run succeeded");
                ui::success_banner("Done!");
            }
            Err(e) => {
                self.stage = Stage::Failed;
                error!(error = %e, "Pipeline run failed");
            }
        }
        result
    }

    fn enter(&mut self, stage: Stage) {
        info!("Entering stage {stage:?}");
        if let Some(banner) = stage.banner() {
            ui::stage_banner(banner);
        }
        self.stage = stage;
    }

    async fn execute(&mut self, options: RunOptions) -> Result<()> {
        if options.teardown {
            self.enter(Stage::TearingDown);
            SchemaManager::new(self.warehouse).teardown().await?;
        }

        self.enter(Stage::Initializing);
        SchemaManager::new(self.warehouse).initialize().await?;

        self.enter(Stage::Extracting);
        extract::extract_rates(
            self.rates,
            &self.config.currencies_dir(),
            self.config.start_year,
        )
        .await?;

        self.enter(Stage::Loading);
        let loader = BulkLoader::new(self.warehouse);
        let currency_reference_rows = self.load_currency_tables(&loader).await?;

        if options.format_price_files {
            prices::format_price_dir(&self.config.stocks_dir())?;
            prices::format_price_dir(&self.config.etfs_dir())?;
        }
        self.load_price_tables(&loader, &self.config.stocks_dir(), schema::FACT_STOCK_PRICE)
            .await?;
        self.load_price_tables(&loader, &self.config.etfs_dir(), schema::FACT_ETF_PRICE)
            .await?;

        if options.format_commodities_files {
            commodities::normalize_commodity_file(&self.config.commodities_source())?;
        }
        self.load_commodity_tables(&loader).await?;

        self.enter(Stage::Deriving);
        DerivationEngine::new(self.warehouse)
            .derive_date_dimension(&DATE_SOURCES)
            .await?;

        self.enter(Stage::Validating);
        self.validate(currency_reference_rows).await
    }

    /// Loads the per-currency rate files and the static currency reference.
    /// Returns the reference file's row count, the exact-load expectation
    /// checked by the gate.
    async fn load_currency_tables(&self, loader: &BulkLoader<'_>) -> Result<u64> {
        let columns = rate_fact_columns();
        let dir = self.config.currencies_dir();

        let pb = ui::new_progress_bar(CURRENCIES.len() as u64, true);
        for base in CURRENCIES {
            pb.set_message(base);
            let path = dir.join(format!("rates-{base}.csv"));
            loader
                .load_file(&path, schema::FACT_EXCHANGE_RATE, &columns)
                .await?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        let reference_columns: Vec<String> = ["code", "display_name", "subunit", "symbol"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        loader
            .load_file(
                &self.config.currency_meta_file(),
                schema::DIM_CURRENCY,
                &reference_columns,
            )
            .await
            .context("Failed to load the currency reference file")
    }

    async fn load_price_tables(
        &self,
        loader: &BulkLoader<'_>,
        dir: &Path,
        table: &str,
    ) -> Result<()> {
        let files = prices::price_source_files(dir)?;
        let columns: Vec<String> = prices::PRICE_COLUMNS.iter().map(|c| c.to_string()).collect();

        let pb = ui::new_progress_bar(files.len() as u64, false);
        for file in &files {
            loader.load_file(file, table, &columns).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!("Loaded {} price files into {table}", files.len());
        Ok(())
    }

    async fn load_commodity_tables(&self, loader: &BulkLoader<'_>) -> Result<()> {
        let dir = self.config.commodities_dir();

        let fact_columns: Vec<String> = commodities::COMMODITY_FACT_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        loader
            .load_file(
                &dir.join("commodities-fact.csv"),
                schema::FACT_COMMODITIES_STATS,
                &fact_columns,
            )
            .await?;

        let dimension_columns: Vec<String> = commodities::COMMODITY_DIM_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        loader
            .load_file(
                &dir.join("commodities-dim.csv"),
                schema::DIM_COMMODITY,
                &dimension_columns,
            )
            .await?;

        Ok(())
    }

    async fn validate(&self, currency_reference_rows: u64) -> Result<()> {
        let gate = QualityGate::new(self.warehouse);

        let pb = ui::new_progress_bar(schema::TABLES.len() as u64, true);
        for table in schema::TABLES {
            pb.set_message(table);
            gate.assert_minimum(table, self.config.min_rows).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        gate.assert_exact(schema::DIM_CURRENCY, currency_reference_rows)
            .await
    }
}

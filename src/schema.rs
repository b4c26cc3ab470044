//! Warehouse schema definition and lifecycle

use anyhow::{Context, Result};
use tracing::info;

use crate::core::currency::CURRENCIES;
use crate::core::warehouse::Warehouse;

/// Schema owning every pipeline table.
pub const SCHEMA: &str = "currencies";

pub const FACT_EXCHANGE_RATE: &str = "currencies.fact_exchange_rate";
pub const FACT_STOCK_PRICE: &str = "currencies.fact_stock_price";
pub const FACT_ETF_PRICE: &str = "currencies.fact_etf_price";
pub const FACT_COMMODITIES_STATS: &str = "currencies.fact_commodities_stats";
pub const DIM_DATE: &str = "currencies.dim_date";
pub const DIM_CURRENCY: &str = "currencies.dim_currency";
pub const DIM_COMMODITY: &str = "currencies.dim_commodity";

/// Every table the pipeline owns, in creation order.
pub const TABLES: [&str; 7] = [
    FACT_EXCHANGE_RATE,
    DIM_DATE,
    DIM_CURRENCY,
    FACT_STOCK_PRICE,
    FACT_ETF_PRICE,
    FACT_COMMODITIES_STATS,
    DIM_COMMODITY,
];

fn create_schema() -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {SCHEMA};")
}

fn drop_schema() -> String {
    format!("DROP SCHEMA IF EXISTS {SCHEMA} CASCADE;")
}

/// The exchange rate fact carries one REAL column per tracked currency,
/// generated from the shared constant so DDL and load order cannot drift.
fn create_exchange_rate_fact() -> String {
    let rate_columns = CURRENCIES
        .iter()
        .map(|code| format!("    {} REAL", code.to_lowercase()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE TABLE IF NOT EXISTS {FACT_EXCHANGE_RATE}\n\
         (\n\
         \x20   id               SERIAL PRIMARY KEY,\n\
         \x20   source_currency  TEXT NOT NULL,\n\
         \x20   observation_date DATE NOT NULL,\n\
         {rate_columns}\n\
         );"
    )
}

fn create_date_dimension() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {DIM_DATE}\n\
         (\n\
         \x20   date         DATE PRIMARY KEY,\n\
         \x20   day_of_month INT,\n\
         \x20   iso_week     INT,\n\
         \x20   month        INT,\n\
         \x20   year         INT,\n\
         \x20   quarter      INT,\n\
         \x20   day_of_week  INT,\n\
         \x20   day_of_year  INT\n\
         );"
    )
}

fn create_currency_dimension() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {DIM_CURRENCY}\n\
         (\n\
         \x20   code         TEXT NOT NULL,\n\
         \x20   display_name TEXT NOT NULL,\n\
         \x20   subunit      TEXT,\n\
         \x20   symbol       TEXT\n\
         );"
    )
}

fn create_price_fact(table: &str, symbol_nullable: bool) -> String {
    let symbol_constraint = if symbol_nullable { "" } else { " NOT NULL" };
    format!(
        "CREATE TABLE IF NOT EXISTS {table}\n\
         (\n\
         \x20   id         SERIAL PRIMARY KEY,\n\
         \x20   symbol     TEXT{symbol_constraint},\n\
         \x20   price_date DATE NOT NULL,\n\
         \x20   open       REAL,\n\
         \x20   high       REAL,\n\
         \x20   low        REAL,\n\
         \x20   close      REAL,\n\
         \x20   volume     BIGINT\n\
         );"
    )
}

fn create_commodities_fact() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {FACT_COMMODITIES_STATS}\n\
         (\n\
         \x20   id              SERIAL PRIMARY KEY,\n\
         \x20   country_or_area TEXT,\n\
         \x20   year            INT,\n\
         \x20   commodity_code  TEXT,\n\
         \x20   flow_direction  TEXT,\n\
         \x20   trade_value_usd REAL,\n\
         \x20   weight_kg       REAL,\n\
         \x20   quantity        REAL\n\
         );"
    )
}

fn create_commodity_dimension() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {DIM_COMMODITY}\n\
         (\n\
         \x20   commodity_code     TEXT NOT NULL,\n\
         \x20   commodity_name     TEXT,\n\
         \x20   quantity_unit_name TEXT,\n\
         \x20   category           TEXT\n\
         );"
    )
}

/// Ordered DDL to build the schema and every table, schema first. Idempotent.
pub fn initialize_statements() -> Vec<String> {
    vec![
        create_schema(),
        create_exchange_rate_fact(),
        create_date_dimension(),
        create_currency_dimension(),
        create_price_fact(FACT_STOCK_PRICE, false),
        create_price_fact(FACT_ETF_PRICE, true),
        create_commodities_fact(),
        create_commodity_dimension(),
    ]
}

/// Ordered DDL to destroy the schema and everything in it. Idempotent.
pub fn teardown_statements() -> Vec<String> {
    vec![drop_schema()]
}

/// Applies schema lifecycle DDL to the warehouse.
///
/// Statements run with autocommit, so a failure mid-list leaves earlier
/// statements applied. Both operations are safe to re-run.
pub struct SchemaManager<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> SchemaManager<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        SchemaManager { warehouse }
    }

    /// Drops the schema and all contained tables.
    pub async fn teardown(&self) -> Result<()> {
        info!("Dropping warehouse schema {SCHEMA}");
        self.warehouse
            .execute(&teardown_statements())
            .await
            .context("Failed to tear down warehouse schema")
    }

    /// Creates the schema and every destination table if absent.
    pub async fn initialize(&self) -> Result<()> {
        info!("Creating warehouse schema {SCHEMA}");
        self.warehouse
            .execute(&initialize_statements())
            .await
            .context("Failed to initialize warehouse schema")
    }
}

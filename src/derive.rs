//! Date dimension derivation from observed fact dates

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tracing::info;

use crate::core::calendar::DateDimensionRow;
use crate::core::warehouse::Warehouse;
use crate::schema;

/// Fact tables that feed the date dimension, with their date columns.
/// The commodity fact carries only a year and is not a source.
pub const DATE_SOURCES: [(&str, &str); 3] = [
    (schema::FACT_EXCHANGE_RATE, "observation_date"),
    (schema::FACT_STOCK_PRICE, "price_date"),
    (schema::FACT_ETF_PRICE, "price_date"),
];

/// Computes the date dimension from dates present in the fact tables.
///
/// Purely derived: the dimension holds exactly the dates observed across
/// the sources, never a generated calendar range, so it must run after
/// every fact load it depends on. Inserts are insert-if-absent, which makes
/// re-derivation a no-op.
pub struct DerivationEngine<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> DerivationEngine<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        DerivationEngine { warehouse }
    }

    /// Returns the number of dimension rows actually inserted.
    pub async fn derive_date_dimension(&self, sources: &[(&str, &str)]) -> Result<u64> {
        let mut dates = BTreeSet::new();
        for (table, date_column) in sources {
            let observed = self
                .warehouse
                .distinct_dates(table, date_column)
                .await
                .with_context(|| format!("Failed to collect dates from {table}"))?;
            dates.extend(observed);
        }

        let rows: Vec<DateDimensionRow> = dates.into_iter().map(DateDimensionRow::from).collect();
        let inserted = self
            .warehouse
            .insert_date_rows(&rows)
            .await
            .context("Failed to insert date dimension rows")?;

        info!(
            "Derived date dimension: {} distinct dates, {inserted} new rows",
            rows.len()
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryWarehouse;

    async fn warehouse_with_facts() -> MemoryWarehouse {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .execute(&crate::schema::initialize_statements())
            .await
            .unwrap();

        let rate_columns: Vec<String> = ["source_currency", "observation_date"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        warehouse
            .copy_csv(
                schema::FACT_EXCHANGE_RATE,
                &rate_columns,
                b"EUR,2020-01-02\nEUR,2020-01-03\nUSD,2020-01-02\n",
            )
            .await
            .unwrap();

        let price_columns: Vec<String> = ["symbol", "price_date"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        warehouse
            .copy_csv(
                schema::FACT_STOCK_PRICE,
                &price_columns,
                b"aapl,2020-01-03\naapl,2020-04-01\n",
            )
            .await
            .unwrap();

        warehouse
    }

    fn sources() -> [(&'static str, &'static str); 2] {
        [
            (schema::FACT_EXCHANGE_RATE, "observation_date"),
            (schema::FACT_STOCK_PRICE, "price_date"),
        ]
    }

    #[tokio::test]
    async fn test_dates_collapse_across_fact_tables() {
        let warehouse = warehouse_with_facts().await;
        let engine = DerivationEngine::new(&warehouse);

        let inserted = engine.derive_date_dimension(&sources()).await.unwrap();

        // 2020-01-02, 2020-01-03 and 2020-04-01; the overlap collapses.
        assert_eq!(inserted, 3);
        assert_eq!(warehouse.count_rows(schema::DIM_DATE, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_projected_fields_match_the_calendar() {
        let warehouse = warehouse_with_facts().await;
        DerivationEngine::new(&warehouse)
            .derive_date_dimension(&sources())
            .await
            .unwrap();

        let rows = warehouse.rows(schema::DIM_DATE).await.unwrap();
        // 2020-01-03 was a Friday (Sunday = 0) in Q1.
        let friday = rows.iter().find(|row| row[0] == "2020-01-03").unwrap();
        assert_eq!(friday[1], "3"); // day_of_month
        assert_eq!(friday[5], "1"); // quarter
        assert_eq!(friday[6], "5"); // day_of_week
        // 2020-04-01 was a Wednesday in Q2.
        let wednesday = rows.iter().find(|row| row[0] == "2020-04-01").unwrap();
        assert_eq!(wednesday[5], "2");
        assert_eq!(wednesday[6], "3");
        assert_eq!(wednesday[7], "92"); // day_of_year
    }

    #[tokio::test]
    async fn test_rederivation_is_idempotent() {
        let warehouse = warehouse_with_facts().await;
        let engine = DerivationEngine::new(&warehouse);

        let first = engine.derive_date_dimension(&sources()).await.unwrap();
        let before = warehouse.rows(schema::DIM_DATE).await.unwrap();

        let second = engine.derive_date_dimension(&sources()).await.unwrap();
        let after = warehouse.rows(schema::DIM_DATE).await.unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_missing_fact_table_aborts_derivation() {
        let warehouse = MemoryWarehouse::new();
        let engine = DerivationEngine::new(&warehouse);

        let error = engine.derive_date_dimension(&sources()).await.unwrap_err();
        assert!(error.to_string().contains("Failed to collect dates"));
    }
}

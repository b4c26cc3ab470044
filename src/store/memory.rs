use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::calendar::DateDimensionRow;
use crate::core::warehouse::Warehouse;
use crate::schema::DIM_DATE;

#[derive(Debug, Default, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    statements: Vec<String>,
}

/// In-process warehouse implementation backed by plain maps.
///
/// Mirrors the store contract closely enough for tests and dry runs: tables
/// must exist before rows can land in them, `DROP SCHEMA` clears everything,
/// and date dimension inserts are insert-if-absent on the date key.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    inner: Mutex<Inner>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements that reached the store, in execution order.
    pub async fn executed_statements(&self) -> Vec<String> {
        self.inner.lock().await.statements.clone()
    }

    /// Copy of a table's rows, for assertions.
    pub async fn rows(&self, table: &str) -> Option<Vec<Vec<String>>> {
        let inner = self.inner.lock().await;
        inner.tables.get(table).map(|t| t.rows.clone())
    }

    fn created_table_name(statement: &str) -> Option<String> {
        if !statement.starts_with("CREATE TABLE") {
            return None;
        }
        let mut tokens = statement.split_whitespace();
        tokens
            .by_ref()
            .find(|token| *token == "EXISTS")
            .and_then(|_| tokens.next())
            .map(|name| name.trim_end_matches(['(', ';']).to_string())
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&self, statements: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for statement in statements {
            if statement.starts_with("DROP SCHEMA") {
                inner.tables.clear();
            } else if let Some(table) = Self::created_table_name(statement) {
                inner.tables.entry(table).or_default();
            }
            inner.statements.push(statement.clone());
        }
        debug!("Executed {} statements", statements.len());
        Ok(())
    }

    async fn copy_csv(&self, table: &str, columns: &[String], data: &[u8]) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("relation \"{table}\" does not exist"))?;

        if stored.columns.is_empty() {
            stored.columns = columns.to_vec();
        } else if stored.columns != columns {
            return Err(anyhow!(
                "column order mismatch for {table}: expected {:?}",
                stored.columns
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data);
        let mut loaded = 0;
        for record in reader.records() {
            let record = record?;
            if record.len() != columns.len() {
                return Err(anyhow!(
                    "row has {} fields, {table} expects {}",
                    record.len(),
                    columns.len()
                ));
            }
            stored.rows.push(record.iter().map(str::to_string).collect());
            loaded += 1;
        }
        debug!("Copied {loaded} rows into {table}");
        Ok(loaded)
    }

    async fn distinct_dates(&self, table: &str, date_column: &str) -> Result<Vec<NaiveDate>> {
        let inner = self.inner.lock().await;
        let stored = inner
            .tables
            .get(table)
            .ok_or_else(|| anyhow!("relation \"{table}\" does not exist"))?;

        let position = stored
            .columns
            .iter()
            .position(|column| column == date_column)
            .ok_or_else(|| anyhow!("column \"{date_column}\" of {table} does not exist"))?;

        let mut dates = BTreeSet::new();
        for row in &stored.rows {
            let value = row
                .get(position)
                .ok_or_else(|| anyhow!("row in {table} is missing {date_column}"))?;
            dates.insert(NaiveDate::parse_from_str(value, "%Y-%m-%d")?);
        }
        Ok(dates.into_iter().collect())
    }

    async fn insert_date_rows(&self, rows: &[DateDimensionRow]) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .tables
            .get_mut(DIM_DATE)
            .ok_or_else(|| anyhow!("relation \"{DIM_DATE}\" does not exist"))?;

        if stored.columns.is_empty() {
            stored.columns = [
                "date",
                "day_of_month",
                "iso_week",
                "month",
                "year",
                "quarter",
                "day_of_week",
                "day_of_year",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect();
        }

        let mut inserted = 0;
        for row in rows {
            let key = row.date.format("%Y-%m-%d").to_string();
            if stored.rows.iter().any(|existing| existing[0] == key) {
                continue;
            }
            stored.rows.push(vec![
                key,
                row.day_of_month.to_string(),
                row.iso_week.to_string(),
                row.month.to_string(),
                row.year.to_string(),
                row.quarter.to_string(),
                row.day_of_week.to_string(),
                row.day_of_year.to_string(),
            ]);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn count_rows(&self, table: &str, limit: Option<u64>) -> Result<u64> {
        let inner = self.inner.lock().await;
        let stored = inner
            .tables
            .get(table)
            .ok_or_else(|| anyhow!("relation \"{table}\" does not exist"))?;

        let count = stored.rows.len() as u64;
        Ok(match limit {
            Some(limit) => count.min(limit),
            None => count,
        })
    }
}

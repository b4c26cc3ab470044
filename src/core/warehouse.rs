//! Warehouse store abstractions

use crate::core::calendar::DateDimensionRow;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// The relational store the pipeline writes into.
///
/// Implementations own connection handling; the contract is
/// acquire-use-release per call, so no connection outlives a stage. All
/// operations are synchronous from the pipeline's point of view: each call
/// completes (or fails) before the next stage begins.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Executes an ordered statement list with autocommit per statement.
    /// A failing statement aborts the remainder of the list; statements
    /// already applied stay applied.
    async fn execute(&self, statements: &[String]) -> Result<()>;

    /// Bulk-copies headerless CSV data into `table`. Columns are positional:
    /// field N of every row lands in `columns[N]`. Returns rows loaded.
    async fn copy_csv(&self, table: &str, columns: &[String], data: &[u8]) -> Result<u64>;

    /// Distinct values of a DATE column, for dimension derivation.
    async fn distinct_dates(&self, table: &str, date_column: &str) -> Result<Vec<NaiveDate>>;

    /// Inserts date dimension rows, skipping dates already present.
    /// Returns rows actually inserted.
    async fn insert_date_rows(&self, rows: &[DateDimensionRow]) -> Result<u64>;

    /// Row count of `table`. With `limit`, counts at most `limit` rows
    /// (a bounded sample, cheap on large tables); without, counts all.
    async fn count_rows(&self, table: &str, limit: Option<u64>) -> Result<u64>;
}

//! Bulk loading of load-ready CSV files into warehouse tables

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::core::error::PipelineError;
use crate::core::warehouse::Warehouse;

/// Streams normalized source files into destination tables.
///
/// The column order passed to [`BulkLoader::load_file`] is a positional
/// contract: field N of every row lands in column N. Because a silent
/// mismatch would load wrong data, every row's field count is validated
/// against the contract before any byte reaches the store. Loads never
/// deduplicate — re-running a load without a teardown duplicates rows.
pub struct BulkLoader<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> BulkLoader<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        BulkLoader { warehouse }
    }

    /// Bulk-copies one headerless CSV file into `table`. Returns rows
    /// loaded; a file with no rows is a no-op.
    pub async fn load_file(
        &self,
        path: &Path,
        table: &str,
        columns: &[String],
    ) -> Result<u64> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open source file: {}", path.display()))?;

        let mut data = csv::Writer::from_writer(Vec::new());
        let mut rows = 0u64;
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read {}", path.display()))?;
            if record.len() != columns.len() {
                return Err(PipelineError::Load {
                    table: table.to_string(),
                    reason: format!(
                        "{} row {} has {} fields, destination expects {}",
                        path.display(),
                        rows + 1,
                        record.len(),
                        columns.len()
                    ),
                }
                .into());
            }
            data.write_record(&record)?;
            rows += 1;
        }

        if rows == 0 {
            debug!("{} has no rows, nothing to load", path.display());
            return Ok(0);
        }

        let data = data
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to serialize load buffer: {e}"))?;
        let loaded = self
            .warehouse
            .copy_csv(table, columns, &data)
            .await
            .map_err(|e| PipelineError::Load {
                table: table.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Loaded {loaded} rows from {} into {table}", path.display());
        Ok(loaded)
    }
}

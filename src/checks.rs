//! Post-load integrity checks gating pipeline success

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::error::PipelineError;
use crate::core::warehouse::Warehouse;

/// Runs row-count assertions against loaded tables.
///
/// This is a post-hoc gate: it runs after every load has succeeded, and a
/// violation still fails the whole run.
pub struct QualityGate<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> QualityGate<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        QualityGate { warehouse }
    }

    /// Fails unless `table` holds at least `min_rows` rows. The count is a
    /// sample bounded at `min_rows`, so the check stays cheap on big tables.
    pub async fn assert_minimum(&self, table: &str, min_rows: u64) -> Result<()> {
        let count = self
            .warehouse
            .count_rows(table, Some(min_rows))
            .await
            .with_context(|| format!("Failed to check row count of {table}"))?;

        if count < min_rows {
            return Err(PipelineError::Integrity {
                table: table.to_string(),
                condition: format!("expected at least {min_rows} rows, found {count}"),
            }
            .into());
        }
        debug!("{table} holds at least {min_rows} rows");
        Ok(())
    }

    /// Fails unless `table` holds exactly `expected_rows` rows — over and
    /// under both violate. Used for fully-static reference data whose
    /// source row count is known.
    pub async fn assert_exact(&self, table: &str, expected_rows: u64) -> Result<()> {
        let count = self
            .warehouse
            .count_rows(table, None)
            .await
            .with_context(|| format!("Failed to check row count of {table}"))?;

        if count != expected_rows {
            return Err(PipelineError::Integrity {
                table: table.to_string(),
                condition: format!("expected exactly {expected_rows} rows, found {count}"),
            }
            .into());
        }
        debug!("{table} holds exactly {expected_rows} rows");
        Ok(())
    }
}

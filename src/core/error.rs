//! Failure classes that abort a pipeline run

use thiserror::Error;

/// Fatal pipeline failures, carried inside `anyhow::Error` so callers can
/// match on the failure class with `downcast_ref`.
///
/// Two conditions from the run never appear here because they are handled
/// where they occur: a "range predates available data" response from the
/// rate service (recovered by advancing the query year) and a price source
/// file with zero data rows (skipped by the formatter).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The rate service answered with a non-recoverable status.
    #[error("exchange rate service returned {status} for base currency {base}")]
    RemoteFailure { base: String, status: u16 },

    /// The forward search over start years reached the current year without
    /// the service ever reporting data.
    #[error("no exchange rate history available for {base} up to {year}")]
    HistoryExhausted { base: String, year: i32 },

    /// The store rejected a bulk load, or the source rows do not match the
    /// destination column order.
    #[error("bulk load into {table} failed: {reason}")]
    Load { table: String, reason: String },

    /// A post-load integrity check did not hold.
    #[error("integrity check failed for {table}: {condition}")]
    Integrity { table: String, condition: String },
}

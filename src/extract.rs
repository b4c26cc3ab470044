//! Extraction stage: pull rate histories and unload them as load-ready CSVs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::ui;
use crate::core::currency::CURRENCIES;
use crate::core::rates::{RateHistory, RateHistoryProvider};

/// Fetches the full history for every tracked currency and unloads each one
/// into `destination`. Currencies are fetched one at a time; the first fatal
/// fetch error aborts the stage.
pub async fn extract_rates(
    provider: &dyn RateHistoryProvider,
    destination: &Path,
    start_year: i32,
) -> Result<()> {
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create directory: {}", destination.display()))?;

    let pb = ui::new_progress_bar(CURRENCIES.len() as u64, true);
    for base in CURRENCIES {
        pb.set_message(base);
        let history = provider.fetch_history(base, start_year).await?;
        unload_rates(destination, &history)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(())
}

/// Writes one base currency's history as `rates-<BASE>.csv`: headerless,
/// one row per observation date, cross-rate columns in the fixed currency
/// order.
///
/// A cross-rate absent from the day's payload is written as 1.0. In practice
/// that fills the base currency's own column (the service never echoes the
/// self-rate), but it also masks genuine gaps as 1.0 — kept because loaded
/// history depends on it, flagged as a data-quality risk in DESIGN.md.
pub fn unload_rates(destination: &Path, history: &RateHistory) -> Result<PathBuf> {
    let path = destination.join(format!("rates-{}.csv", history.base));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create rates file: {}", path.display()))?;

    for (date, rates) in &history.rates {
        let mut record = vec![history.base.clone(), date.format("%Y-%m-%d").to_string()];
        for code in CURRENCIES {
            let rate = rates.get(code).copied().unwrap_or(1.0);
            record.push(rate.to_string());
        }
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write rates file: {}", path.display()))?;
    debug!(
        "Unloaded {} observation dates for {} to {}",
        history.rates.len(),
        history.base,
        path.display()
    );
    Ok(path)
}

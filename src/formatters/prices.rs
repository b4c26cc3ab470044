//! Price source file normalization for the stock and ETF fact tables

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::ui;

/// Destination column order of both price fact tables.
pub const PRICE_COLUMNS: [&str; 7] =
    ["symbol", "price_date", "open", "high", "low", "close", "volume"];

/// Source columns projected into the destination layout, in order. The
/// upstream dumps carry one extra open-interest column which is dropped.
const SOURCE_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Result of normalizing one price source file.
#[derive(Debug, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// File rewritten in the load-ready layout, with this many data rows.
    Formatted(usize),
    /// File had no data rows; left untouched, nothing to load.
    Skipped,
}

/// Rewrites a per-symbol price file into the load-ready shape: headerless,
/// the symbol (taken from the filename stem) injected as the leading column,
/// followed by date, OHLC and volume.
///
/// Destructive: the source file is overwritten in place. A file with zero
/// data rows is skipped, not an error.
pub fn normalize_price_file(path: &Path) -> Result<NormalizeOutcome> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open price file: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let records = reader
        .into_records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read price file: {}", path.display()))?;

    if records.is_empty() {
        debug!("Price file {} has no data rows, skipping", path.display());
        return Ok(NormalizeOutcome::Skipped);
    }

    let positions = SOURCE_COLUMNS
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|header| header == *name)
                .ok_or_else(|| {
                    anyhow!("Price file {} has no '{name}' column", path.display())
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let symbol = symbol_from_path(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to rewrite price file: {}", path.display()))?;
    for record in &records {
        let mut row = vec![symbol.as_str()];
        for &position in &positions {
            row.push(record.get(position).unwrap_or(""));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;

    Ok(NormalizeOutcome::Formatted(records.len()))
}

/// Normalizes every price source file in `dir`.
pub fn format_price_dir(dir: &Path) -> Result<()> {
    let files = price_source_files(dir)?;

    let pb = ui::new_progress_bar(files.len() as u64, false);
    let mut skipped = 0;
    for file in &files {
        if normalize_price_file(file)? == NormalizeOutcome::Skipped {
            skipped += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    debug!(
        "Formatted {} price files in {} ({skipped} empty)",
        files.len(),
        dir.display()
    );
    Ok(())
}

/// Price source files (`*.txt`) under `dir`, sorted by name. A missing
/// directory is an empty source, not an error.
pub fn price_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list price files in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Symbol encoded in the filename: everything before the first dot, so
/// `aapl.us.txt` yields `aapl`.
fn symbol_from_path(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive symbol from filename: {}", path.display()))
}

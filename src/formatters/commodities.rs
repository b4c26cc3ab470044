//! Commodity trade statistics normalization: one wide source file split into
//! a fact projection and a deduplicated dimension projection

use anyhow::{Context, Result, anyhow};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination column order of the commodity fact table.
pub const COMMODITY_FACT_COLUMNS: [&str; 7] = [
    "country_or_area",
    "year",
    "commodity_code",
    "flow_direction",
    "trade_value_usd",
    "weight_kg",
    "quantity",
];

/// Destination column order of the commodity dimension table.
pub const COMMODITY_DIM_COLUMNS: [&str; 4] =
    ["commodity_code", "commodity_name", "quantity_unit_name", "category"];

/// Source header names, as shipped in the wide trade statistics dump.
const SOURCE_COLUMNS: [&str; 10] = [
    "country_or_area",
    "year",
    "comm_code",
    "commodity",
    "flow",
    "trade_usd",
    "weight_kg",
    "quantity_name",
    "quantity",
    "category",
];

/// Load-ready files produced from the wide commodity source.
#[derive(Debug)]
pub struct CommodityFiles {
    pub facts: PathBuf,
    pub fact_rows: usize,
    pub dimensions: PathBuf,
    pub dimension_rows: usize,
}

/// Splits the wide commodity statistics file into `commodities-fact.csv` and
/// `commodities-dim.csv` next to the source.
///
/// The two free-text columns (country/area and commodity name) can carry
/// embedded commas; those are replaced with `-` so the headerless output
/// never needs quoting. The dimension projection is deduplicated by
/// commodity code, keeping the first occurrence's attributes.
pub fn normalize_commodity_file(path: &Path) -> Result<CommodityFiles> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open commodity file: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| anyhow!("Commodity file {} has no '{name}' column", path.display()))
    };
    let columns = SOURCE_COLUMNS
        .iter()
        .map(|&name| position(name))
        .collect::<Result<Vec<_>>>()?;
    let [area, year, code, name, flow, trade, weight, unit, quantity, category]: [usize; 10] =
        columns.try_into().expect("fixed source column count");

    let destination = path.parent().unwrap_or_else(|| Path::new("."));
    let facts_path = destination.join("commodities-fact.csv");
    let dimensions_path = destination.join("commodities-dim.csv");
    let mut facts = csv::Writer::from_path(&facts_path)
        .with_context(|| format!("Failed to create {}", facts_path.display()))?;
    let mut dimensions = csv::Writer::from_path(&dimensions_path)
        .with_context(|| format!("Failed to create {}", dimensions_path.display()))?;

    let mut seen_codes = HashSet::new();
    let mut fact_rows = 0;
    let mut dimension_rows = 0;
    for record in reader.into_records() {
        let record =
            record.with_context(|| format!("Failed to read {}", path.display()))?;
        let field = |index: usize| record.get(index).unwrap_or("");

        let sanitized_area = field(area).replace(',', "-");
        let sanitized_name = field(name).replace(',', "-");

        facts.write_record([
            sanitized_area.as_str(),
            field(year),
            field(code),
            field(flow),
            field(trade),
            field(weight),
            field(quantity),
        ])?;
        fact_rows += 1;

        if seen_codes.insert(field(code).to_string()) {
            dimensions.write_record([
                field(code),
                sanitized_name.as_str(),
                field(unit),
                field(category),
            ])?;
            dimension_rows += 1;
        }
    }
    facts.flush()?;
    dimensions.flush()?;

    debug!(
        "Split {} into {fact_rows} fact rows and {dimension_rows} dimension rows",
        path.display()
    );
    Ok(CommodityFiles {
        facts: facts_path,
        fact_rows,
        dimensions: dimensions_path,
        dimension_rows,
    })
}

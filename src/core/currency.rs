//! The fixed currency code set shared by extraction, normalization and loading

/// Every currency the warehouse tracks, lexicographically sorted.
///
/// The order is load-bearing: it is the column order of the rate fact table,
/// the column order of the unloaded rate CSVs, and the order cross-rates are
/// projected from each API payload. Extraction, DDL and bulk loads all read
/// from this one constant.
pub const CURRENCIES: [&str; 33] = [
    "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD",
    "HRK", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MXN", "MYR", "NOK",
    "NZD", "PHP", "PLN", "RON", "RUB", "SEK", "SGD", "THB", "TRY", "USD", "ZAR",
];

/// Destination column order for the exchange rate fact table: the two key
/// columns followed by one lowercase column per tracked currency.
pub fn rate_fact_columns() -> Vec<String> {
    let mut columns = vec!["source_currency".to_string(), "observation_date".to_string()];
    columns.extend(CURRENCIES.iter().map(|code| code.to_lowercase()));
    columns
}

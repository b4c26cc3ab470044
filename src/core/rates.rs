//! Exchange rate history abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Full rate history for one base currency as returned by the remote
/// time-series service. Dates are kept ordered so unloaded files are
/// deterministic.
#[derive(Debug, Clone, Deserialize)]
pub struct RateHistory {
    pub base: String,
    pub rates: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl RateHistory {
    /// Year of the earliest observation, if any data came back.
    pub fn earliest_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.rates.keys().next().map(|date| date.year())
    }
}

#[async_trait]
pub trait RateHistoryProvider: Send + Sync {
    /// Fetches the full rate history for `base` from `start_year-01-01`
    /// through today, advancing the start year as the service dictates.
    async fn fetch_history(&self, base: &str, start_year: i32) -> Result<RateHistory>;
}

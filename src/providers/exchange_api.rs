use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::core::error::PipelineError;
use crate::core::rates::{RateHistory, RateHistoryProvider};

// ExchangeRateApi implementation for RateHistoryProvider
pub struct ExchangeRateApi {
    base_url: String,
}

impl ExchangeRateApi {
    pub fn new(base_url: &str) -> Self {
        ExchangeRateApi {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl RateHistoryProvider for ExchangeRateApi {
    #[instrument(
        name = "RateHistoryFetch",
        skip(self),
        fields(base = %base)
    )]
    async fn fetch_history(&self, base: &str, start_year: i32) -> Result<RateHistory> {
        let today = Utc::now().date_naive();
        let current_year = today.year();
        let mut year = start_year;

        let client = reqwest::Client::builder().user_agent("ratemart/1.0").build()?;

        // The service answers 400 when the requested window starts before its
        // earliest data. That is a "too early" signal, not a transient fault,
        // so the recovery is a linear forward search over start years, bounded
        // by the current calendar year.
        loop {
            let url = format!(
                "{}/history?start_at={year}-01-01&end_at={}&base={base}",
                self.base_url,
                today.format("%Y-%m-%d"),
            );
            debug!("Requesting rate history from {}", url);

            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Failed to request rate history for {base}"))?;

            let status = response.status();
            if status.is_success() {
                let text = response.text().await?;
                let history: RateHistory = serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse rate history for {base}"))?;
                debug!(
                    "Fetched {} observation dates for {base} starting {year}",
                    history.rates.len()
                );
                return Ok(history);
            }

            if status == StatusCode::BAD_REQUEST {
                if year >= current_year {
                    return Err(PipelineError::HistoryExhausted {
                        base: base.to_string(),
                        year,
                    }
                    .into());
                }
                debug!("No rates for {base} starting {year}, advancing one year");
                year += 1;
                continue;
            }

            return Err(PipelineError::RemoteFailure {
                base: base.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
    }
}

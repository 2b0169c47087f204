use super::util::with_retry;
use crate::core::config::ProviderConfig;
use crate::core::error::{RateError, Result};
use crate::core::provider::RateProvider;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, instrument};

/// Date format the provider expects in query strings and cache keys.
pub const PROVIDER_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn to_provider_date(date: NaiveDate) -> String {
    date.format(PROVIDER_DATE_FORMAT).to_string()
}

/// Central bank `XML_dynamic.asp` endpoint.
pub struct CbrProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl CbrProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retries: usize,
        retry_delay_ms: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("cbr-rates/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries,
            retry_delay_ms,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            config.retries,
            config.retry_delay_ms,
        )
    }

    fn range_url(&self, provider_id: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{}/scripts/XML_dynamic.asp?date_req1={}&date_req2={}&VAL_NM_RQ={}",
            self.base_url,
            to_provider_date(from),
            to_provider_date(to),
            provider_id
        )
    }
}

#[async_trait]
impl RateProvider for CbrProvider {
    #[instrument(skip(self))]
    async fn fetch_range(
        &self,
        provider_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<String> {
        let url = self.range_url(provider_id, from, to);
        debug!("Requesting rate series from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
            },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| RateError::UpstreamUnavailable(e.to_string()))?;

        // Decoded using the charset from the response headers
        response
            .text()
            .await
            .map_err(|e| RateError::UpstreamUnavailable(e.to_string()))
    }
}

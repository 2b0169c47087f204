//! Upstream rate provider abstraction

use crate::core::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the raw time-series document for `provider_id` over `[from, to]`.
    ///
    /// Transport failures surface as `RateError::UpstreamUnavailable`; the
    /// document itself is returned untouched, in-band errors included.
    async fn fetch_range(&self, provider_id: &str, from: NaiveDate, to: NaiveDate)
    -> Result<String>;
}

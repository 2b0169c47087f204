//! Rate cache abstraction

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Date (`DD/MM/YYYY`) to raw rate string, as delivered by the provider.
pub type CachedRateSet = HashMap<String, String>;

/// Key/value store with one record per provider currency id.
///
/// Each `upsert` is atomic on its own; there is no multi-key transaction.
#[async_trait]
pub trait RateCache: Send + Sync {
    /// Returns every cached date for `provider_id`, or an empty map.
    async fn get_all(&self, provider_id: &str) -> Result<CachedRateSet>;

    async fn upsert(&self, provider_id: &str, date: &str, rate: &str) -> Result<()>;
}

use crate::core::cache::{CachedRateSet, RateCache};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate cache, lost on restart.
#[derive(Clone, Default)]
pub struct MemoryRateCache {
    inner: Arc<Mutex<HashMap<String, CachedRateSet>>>,
}

impl MemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateCache for MemoryRateCache {
    async fn get_all(&self, provider_id: &str) -> Result<CachedRateSet> {
        let cache = self.inner.lock().await;
        match cache.get(provider_id) {
            Some(record) => {
                debug!("Cache HIT for {}: {} dates", provider_id, record.len());
                Ok(record.clone())
            }
            None => {
                debug!("Cache MISS for {}", provider_id);
                Ok(CachedRateSet::new())
            }
        }
    }

    async fn upsert(&self, provider_id: &str, date: &str, rate: &str) -> Result<()> {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for {} at {}", provider_id, date);
        cache
            .entry(provider_id.to_string())
            .or_default()
            .insert(date.to_string(), rate.to_string());
        Ok(())
    }
}

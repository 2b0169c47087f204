use crate::core::cache::{CachedRateSet, RateCache};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const RATES_PARTITION: &str = "rates";
const KEY_SEPARATOR: char = '\0';

fn record_prefix(provider_id: &str) -> String {
    format!("{provider_id}{KEY_SEPARATOR}")
}

/// Persistent rate cache backed by a fjall partition.
///
/// Each (provider id, date) pair is its own key, so an upsert is a single
/// atomic insert and a record is read back with a prefix scan.
pub struct FjallRateCache {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallRateCache {
    pub fn open(data_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_path).with_context(|| {
            format!("Failed to create cache directory: {}", data_path.display())
        })?;

        let keyspace = fjall::Config::new(data_path.join("cache"))
            .open()
            .with_context(|| format!("Failed to open cache at {}", data_path.display()))?;
        let partition = keyspace
            .open_partition(RATES_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open rates partition")?;

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl RateCache for FjallRateCache {
    async fn get_all(&self, provider_id: &str) -> Result<CachedRateSet> {
        let prefix = record_prefix(provider_id);
        let mut record = CachedRateSet::new();

        for item in self.partition.prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            let date = std::str::from_utf8(&key[prefix.len()..])?;
            let rate = std::str::from_utf8(&value)?;
            record.insert(date.to_string(), rate.to_string());
        }

        if record.is_empty() {
            debug!("Cache MISS for {}", provider_id);
        } else {
            debug!("Cache HIT for {}: {} dates", provider_id, record.len());
        }
        Ok(record)
    }

    async fn upsert(&self, provider_id: &str, date: &str, rate: &str) -> Result<()> {
        let key = format!("{}{}", record_prefix(provider_id), date);
        self.partition.insert(key.as_bytes(), rate.as_bytes())?;
        self.keyspace.persist(PersistMode::Buffer)?;
        debug!("Cache PUT for {} at {}", provider_id, date);
        Ok(())
    }
}

pub mod disk;
pub mod memory;

use crate::core::cache::RateCache;
use crate::core::config::AppConfig;
use anyhow::Result;
use disk::FjallRateCache;
use memory::MemoryRateCache;
use std::sync::Arc;
use tracing::info;

/// Opens the rate cache selected by the config.
pub fn open_rate_cache(config: &AppConfig) -> Result<Arc<dyn RateCache>> {
    if !config.cache.persist {
        info!("Using in-memory rate cache");
        return Ok(Arc::new(MemoryRateCache::new()));
    }

    let data_path = config.default_data_path()?;
    info!("Using persistent rate cache at {}", data_path.display());
    Ok(Arc::new(FjallRateCache::open(&data_path)?))
}

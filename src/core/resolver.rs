//! Cache-aside rate resolution
//!
//! The resolver checks the rate cache for both dates and only goes to the
//! upstream provider when either one is missing. A partial hit still fetches
//! the whole range and overwrites both entries. Concurrent misses for the
//! same pair may each fetch and upsert identical values.

use crate::core::cache::RateCache;
use crate::core::catalog::CurrencyCatalog;
use crate::core::error::{RateError, Result};
use crate::core::provider::RateProvider;
use crate::providers::cbr_provider::to_provider_date;
use crate::providers::document::parse_range;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Date format accepted from callers.
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPair {
    pub first_rate: f64,
    pub second_rate: f64,
    /// `second_rate - first_rate`
    pub difference: f64,
}

impl ResolvedPair {
    fn new(first_rate: f64, second_rate: f64) -> Self {
        Self {
            first_rate,
            second_rate,
            difference: second_rate - first_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateDifference {
    pub display_name: String,
    pub pair: ResolvedPair,
}

pub fn parse_request_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), REQUEST_DATE_FORMAT)
        .map_err(|e| RateError::MalformedInput(format!("{input}: {e}")))
}

/// Parses a provider rate such as `73,4521` into `73.4521`.
pub fn normalize_rate(raw: &str) -> Result<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            debug!("Unparseable rate value: {:?}", raw);
            RateError::invalid_document()
        })
}

pub struct RateResolver {
    cache: Arc<dyn RateCache>,
    provider: Arc<dyn RateProvider>,
}

impl RateResolver {
    pub fn new(cache: Arc<dyn RateCache>, provider: Arc<dyn RateProvider>) -> Self {
        Self { cache, provider }
    }

    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        provider_id: &str,
        date_one: NaiveDate,
        date_two: NaiveDate,
    ) -> Result<ResolvedPair> {
        let key_one = to_provider_date(date_one);
        let key_two = to_provider_date(date_two);

        // A failed read is treated as a miss
        let cached = match self.cache.get_all(provider_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Rate cache read failed for {}: {:#}", provider_id, e);
                Default::default()
            }
        };

        if let (Some(first), Some(second)) = (cached.get(&key_one), cached.get(&key_two)) {
            match (normalize_rate(first), normalize_rate(second)) {
                (Ok(first), Ok(second)) => {
                    debug!("Both dates cached for {}", provider_id);
                    return Ok(ResolvedPair::new(first, second));
                }
                _ => warn!("Unparseable cached rate for {}, refetching", provider_id),
            }
        }

        self.fetch_and_store(provider_id, date_one, date_two, &key_one, &key_two)
            .await
    }

    /// Fetches the range, and stores the raw boundary rates only once both
    /// have parsed.
    async fn fetch_and_store(
        &self,
        provider_id: &str,
        date_one: NaiveDate,
        date_two: NaiveDate,
        key_one: &str,
        key_two: &str,
    ) -> Result<ResolvedPair> {
        let document = self
            .provider
            .fetch_range(provider_id, date_one, date_two)
            .await?;
        let (first, second) = parse_range(&document)?;
        let pair = ResolvedPair::new(normalize_rate(&first)?, normalize_rate(&second)?);

        for (date, rate) in [(key_one, &first), (key_two, &second)] {
            if let Err(e) = self.cache.upsert(provider_id, date, rate).await {
                warn!(
                    "Rate cache write failed for {} at {}: {:#}",
                    provider_id, date, e
                );
            }
        }

        Ok(pair)
    }

    /// Looks up `symbol`, validates both ISO dates, then resolves the pair.
    ///
    /// Unknown symbols and malformed dates are rejected before the cache or
    /// the provider is touched.
    pub async fn difference_for_symbol(
        &self,
        catalog: &CurrencyCatalog,
        symbol: &str,
        date_one: &str,
        date_two: &str,
    ) -> Result<RateDifference> {
        let entry = catalog.lookup(symbol)?;
        let first_date = parse_request_date(date_one)?;
        let second_date = parse_request_date(date_two)?;

        let pair = self
            .resolve(&entry.provider_id, first_date, second_date)
            .await?;
        Ok(RateDifference {
            display_name: entry.display_name.clone(),
            pair,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CachedRateSet;
    use crate::core::catalog::CurrencyEntry;
    use crate::store::memory::MemoryRateCache;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RANGE_RESPONSE: &str = r#"<?xml version="1.0" encoding="windows-1251"?><ValCurs ID="001" DateRange1="15.01.2021" DateRange2="15.04.2021" name="Foreign Currency Market Dynamic"><Record Date="15.01.2021" Id="001"><Nominal>1</Nominal><Value>73,4521</Value></Record><Record Date="16.01.2021" Id="001"><Nominal>1</Nominal><Value>73,9000</Value></Record><Record Date="15.04.2021" Id="001"><Nominal>1</Nominal><Value>74,1000</Value></Record></ValCurs>"#;

    struct MockProvider {
        response: Result<String>,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(response: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                response,
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for MockProvider {
        async fn fetch_range(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<String> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl RateCache for BrokenCache {
        async fn get_all(&self, _: &str) -> anyhow::Result<CachedRateSet> {
            Err(anyhow!("connection refused"))
        }

        async fn upsert(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn catalog() -> CurrencyCatalog {
        CurrencyCatalog::new([CurrencyEntry {
            symbol: "USD".to_string(),
            display_name: "Dollar".to_string(),
            provider_id: "001".to_string(),
        }])
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_normalize_rate() {
        assert_eq!(normalize_rate("73,4521").unwrap(), 73.4521);
        assert_eq!(normalize_rate(" 74,1000 ").unwrap(), 74.1);
        assert_eq!(normalize_rate("74.1").unwrap(), 74.1);
        assert!(normalize_rate("").is_err());
        assert!(normalize_rate("n/a").is_err());
        assert!(normalize_rate("inf").is_err());
    }

    #[test]
    fn test_difference_is_float_subtraction() {
        let pair = ResolvedPair::new(
            normalize_rate("73,4521").unwrap(),
            normalize_rate("74,1000").unwrap(),
        );
        assert_eq!(pair.difference, 74.1_f64 - 73.4521_f64);
        assert_close(pair.difference, 0.6479);
    }

    #[test]
    fn test_parse_request_date() {
        assert_eq!(parse_request_date("2021-01-15").unwrap(), date(2021, 1, 15));
        assert!(matches!(
            parse_request_date("2021-13-40"),
            Err(RateError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_request_date("15/01/2021"),
            Err(RateError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_cold_resolution_populates_cache() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache.clone(), provider.clone());

        let pair = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(pair.first_rate, 73.4521);
        assert_eq!(pair.second_rate, 74.1);
        assert_close(pair.difference, 0.6479);
        assert_eq!(provider.calls(), 1);

        // Stored exactly as the provider formatted them
        let record = cache.get_all("001").await.unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record["15/01/2021"], "73,4521");
        assert_eq!(record["15/04/2021"], "74,1000");
    }

    #[tokio::test]
    async fn test_warm_resolution_skips_provider() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache, provider.clone());

        let first = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();
        let second = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_partial_hit_refetches_both_dates() {
        let cache = Arc::new(MemoryRateCache::new());
        cache.upsert("001", "15/01/2021", "70,0000").await.unwrap();
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache.clone(), provider.clone());

        let pair = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(pair.first_rate, 73.4521);
        let record = cache.get_all("001").await.unwrap();
        assert_eq!(record["15/01/2021"], "73,4521");
        assert_eq!(record["15/04/2021"], "74,1000");
    }

    #[tokio::test]
    async fn test_in_band_error_leaves_cache_untouched() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Ok(
            "<ValCurs>Ошибка в параметрах</ValCurs>".to_string()
        ));
        let resolver = RateResolver::new(cache.clone(), provider);

        let result = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await;

        assert_eq!(result, Err(RateError::validation("Ошибка в параметрах")));
        assert!(cache.get_all("001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_series_is_validation_failure() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Ok(r#"<ValCurs ID="001" name="Foreign Currency Market Dynamic"></ValCurs>"#.to_string()));
        let resolver = RateResolver::new(cache.clone(), provider);

        let result = resolver
            .resolve("001", date(1900, 1, 15), date(1900, 4, 15))
            .await;

        assert_eq!(result, Err(RateError::invalid_document()));
        assert!(cache.get_all("001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_leaves_cache_untouched() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Err(RateError::UpstreamUnavailable(
            "timed out".to_string(),
        )));
        let resolver = RateResolver::new(cache.clone(), provider);

        let result = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await;

        assert!(matches!(result, Err(RateError::UpstreamUnavailable(_))));
        assert!(cache.get_all("001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_rate_is_not_cached() {
        let cache = Arc::new(MemoryRateCache::new());
        let bad = MockProvider::new(Ok(RANGE_RESPONSE.replacen("73,4521", "n/a", 1)));
        let resolver = RateResolver::new(cache.clone(), bad);

        let result = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await;
        assert_eq!(result, Err(RateError::invalid_document()));
        assert!(cache.get_all("001").await.unwrap().is_empty());

        // A healthy provider afterwards is consulted and the pair resolves
        let healthy = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache.clone(), healthy.clone());
        let pair = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(healthy.calls(), 1);
        assert_eq!(pair.first_rate, 73.4521);
        assert_eq!(cache.get_all("001").await.unwrap()["15/01/2021"], "73,4521");
    }

    #[tokio::test]
    async fn test_unparseable_cached_rate_is_refetched() {
        let cache = Arc::new(MemoryRateCache::new());
        cache.upsert("001", "15/01/2021", "n/a").await.unwrap();
        cache.upsert("001", "15/04/2021", "74,1000").await.unwrap();
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache.clone(), provider.clone());

        let pair = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(pair.first_rate, 73.4521);
        assert_eq!(cache.get_all("001").await.unwrap()["15/01/2021"], "73,4521");
    }

    #[tokio::test]
    async fn test_cache_failure_still_returns_pair() {
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(Arc::new(BrokenCache), provider.clone());

        let pair = resolver
            .resolve("001", date(2021, 1, 15), date(2021, 4, 15))
            .await
            .unwrap();

        assert_eq!(pair.second_rate, 74.1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_difference_for_symbol() {
        let cache = Arc::new(MemoryRateCache::new());
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(cache, provider);

        let result = resolver
            .difference_for_symbol(&catalog(), "USD", "2021-01-15", "2021-04-15")
            .await
            .unwrap();

        assert_eq!(result.display_name, "Dollar");
        assert_eq!(result.pair.first_rate, 73.4521);
        assert_eq!(result.pair.second_rate, 74.1);
    }

    #[tokio::test]
    async fn test_unknown_symbol_touches_nothing() {
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(Arc::new(BrokenCache), provider.clone());

        let result = resolver
            .difference_for_symbol(&catalog(), "XYZ", "2021-01-15", "2021-04-15")
            .await;

        assert_eq!(result, Err(RateError::NotFound("XYZ".to_string())));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_date_skips_provider() {
        let provider = MockProvider::new(Ok(RANGE_RESPONSE.to_string()));
        let resolver = RateResolver::new(Arc::new(MemoryRateCache::new()), provider.clone());

        let result = resolver
            .difference_for_symbol(&catalog(), "USD", "2021-13-40", "2021-04-15")
            .await;

        assert!(matches!(result, Err(RateError::MalformedInput(_))));
        assert_eq!(provider.calls(), 0);
    }
}

//! Per-resource fetch orchestration
//!
//! The fallback chain, in order: fresh cache hit → scheduler-mediated
//! network call (with a bounded retry loop on rate limiting) → stale cache
//! entry → background retry timer. The caller always receives one of the
//! four [`Fetched`] outcomes; expected upstream failures never surface as
//! errors.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::errors::FetchError;
use crate::logger::{self, LogTag};
use crate::retry::RetryScheduler;
use crate::scheduler::RequestScheduler;

/// Composite cache key: resource kind, identifier, optional sub-parameter
/// (e.g. a chart time range).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub kind: &'static str,
    pub id: String,
    pub param: Option<String>,
}

impl ResourceKey {
    pub fn new(kind: &'static str, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            param: None,
        }
    }

    pub fn with_param(kind: &'static str, id: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            param: Some(param.into()),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}:{}:{}", self.kind, self.id, param),
            None => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

/// What a fetch produced, from the consumer's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Served from cache within its TTL; the network was not touched.
    Fresh(T),
    /// Just retrieved from the upstream and written through the cache.
    Updated(T),
    /// Upstream unavailable; last known value served as a degraded fallback.
    Stale(T),
    /// Nothing usable yet; a background retry is armed.
    Pending,
}

impl<T> Fetched<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Fetched::Fresh(v) | Fetched::Updated(v) | Fetched::Stale(v) => Some(v),
            Fetched::Pending => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Fetched::Fresh(v) | Fetched::Updated(v) | Fetched::Stale(v) => Some(v),
            Fetched::Pending => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Fetched::Stale(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Fetched::Pending)
    }
}

/// Cloneable factory for the upstream call, so the background retry path
/// can re-issue it.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

#[derive(Clone)]
pub struct ResourceFetcher {
    cache: Arc<CacheStore>,
    scheduler: Arc<RequestScheduler>,
    retries: Arc<RetryScheduler>,
    retry_delay: Duration,
}

impl ResourceFetcher {
    pub fn new(
        cache: Arc<CacheStore>,
        scheduler: Arc<RequestScheduler>,
        retries: Arc<RetryScheduler>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            cache,
            scheduler,
            retries,
            retry_delay,
        }
    }

    pub fn retries(&self) -> &RetryScheduler {
        &self.retries
    }

    /// Run the full fallback chain for one resource.
    pub async fn fetch<T>(
        &self,
        key: &ResourceKey,
        ttl: Duration,
        max_retries: u32,
        fetch_fn: FetchFn<T>,
    ) -> Fetched<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let cache_key = key.to_string();
        if let Some(entry) = self.cache.get::<T>(&cache_key) {
            if self.cache.is_fresh(&entry, ttl) {
                return Fetched::Fresh(entry.value);
            }
        }
        self.fetch_over_network(key, ttl, max_retries, fetch_fn).await
    }

    /// Manual user-triggered refresh: cancels any armed retry and goes
    /// straight to the network, bypassing the freshness check. The stale
    /// fallback still applies if the forced fetch fails.
    pub async fn refresh<T>(
        &self,
        key: &ResourceKey,
        ttl: Duration,
        max_retries: u32,
        fetch_fn: FetchFn<T>,
    ) -> Fetched<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.retries.cancel(&key.to_string());
        self.fetch_over_network(key, ttl, max_retries, fetch_fn).await
    }

    async fn fetch_over_network<T>(
        &self,
        key: &ResourceKey,
        ttl: Duration,
        max_retries: u32,
        fetch_fn: FetchFn<T>,
    ) -> Fetched<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let cache_key = key.to_string();
        match self.run_with_retries(&cache_key, max_retries, &fetch_fn).await {
            Ok(value) => {
                self.cache.put(&cache_key, &value);
                self.retries.cancel(&cache_key);
                Fetched::Updated(value)
            }
            Err(err) => {
                logger::warning(
                    LogTag::Api,
                    &format!("fetch failed for {}: {}", cache_key, err),
                );
                if let Some(entry) = self.cache.get::<T>(&cache_key) {
                    // Served as-is: the timestamp is not refreshed, the data
                    // is not actually new.
                    return Fetched::Stale(entry.value);
                }
                if !err.is_fatal() {
                    self.arm_retry(key.clone(), ttl, max_retries, fetch_fn);
                }
                Fetched::Pending
            }
        }
    }

    /// Bounded retry on rate limiting: 1 + `max_retries` attempts, each one
    /// re-queued through the scheduler, then the last error propagates to
    /// the fallback chain.
    async fn run_with_retries<T>(
        &self,
        cache_key: &str,
        max_retries: u32,
        fetch_fn: &FetchFn<T>,
    ) -> Result<T, FetchError>
    where
        T: Send + 'static,
    {
        let mut attempt = 0u32;
        loop {
            let label = if attempt == 0 {
                cache_key.to_string()
            } else {
                format!("{} (retry {})", cache_key, attempt)
            };
            match self.scheduler.enqueue(label, (fetch_fn)()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() && attempt < max_retries => {
                    attempt += 1;
                    logger::warning(
                        LogTag::Scheduler,
                        &format!(
                            "rate limited on {}, retry {}/{}",
                            cache_key, attempt, max_retries
                        ),
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn arm_retry<T>(&self, key: ResourceKey, ttl: Duration, max_retries: u32, fetch_fn: FetchFn<T>)
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let this = self.clone();
        let cache_key = key.to_string();
        self.retries.arm(&cache_key, self.retry_delay, move || {
            Box::pin(async move {
                logger::info(LogTag::Retry, &format!("background refresh for {}", key));
                // A failure with still-empty cache re-arms through the same
                // path; success or cancellation ends the loop.
                let _ = this.fetch(&key, ttl, max_retries, fetch_fn).await;
            })
        });
    }
}

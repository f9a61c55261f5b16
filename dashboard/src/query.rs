use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::QueryCache;
pub use crate::cache::QueryState;
use crate::error::FetchResult;
use crate::query_key::QueryKey;
use crate::retry::RetryPolicy;

pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

/// Everything needed to run one query: its cache identity, freshness window,
/// whether it may run at all, and how to fetch it.
pub struct Query<T> {
    pub key: QueryKey,
    pub stale_time: Duration,
    pub enabled: bool,
    fetch: QueryFn<T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            stale_time: self.stale_time,
            enabled: self.enabled,
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("stale_time", &self.stale_time)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    pub fn new<F>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, FetchResult<T>> + Send + Sync + 'static,
    {
        Self {
            key,
            stale_time: Duration::ZERO,
            enabled: true,
            fetch: Arc::new(fetch),
        }
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Runs [`Query`] values through retry and the shared cache.
#[derive(Clone)]
pub struct QueryClient {
    cache: QueryCache,
    retry: RetryPolicy,
}

impl QueryClient {
    pub fn new(cache: QueryCache, retry: RetryPolicy) -> Self {
        Self { cache, retry }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn fetch<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        if !query.enabled {
            debug!(key = %query.key, "Query disabled; not fetching");
            return QueryState::idle();
        }

        let fetch = Arc::clone(&query.fetch);
        let retry = self.retry;
        let label = query.key.to_string();
        let result = self
            .cache
            .fetch(&query.key, query.stale_time, move || async move {
                retry.run(&label, || fetch()).await
            })
            .await;

        match result {
            Ok(data) => QueryState::success(data),
            Err(e) => QueryState::failure(e, self.cache.get::<T>(&query.key)),
        }
    }

    /// Discards freshness for the query's key, then fetches.
    pub async fn refetch<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        self.cache.invalidate(&query.key);
        self.fetch(query).await
    }

    /// Current state without fetching.
    pub fn state<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        if !query.enabled {
            return QueryState::idle();
        }
        self.cache.snapshot(&query.key)
    }
}

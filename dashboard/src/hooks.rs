//! Per-resource queries and the product mutation.
//!
//! Each `*_query` builder fixes the resource's cache key, freshness window
//! and error policy; the matching async method runs it through the shared
//! [`QueryClient`].

use common::config::{CacheConfig, Config};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::QueryCache;
use crate::error::FetchResult;
use crate::fetcher::{POPULAR_PRODUCTS_PATH, PRODUCTS_PATH, ResourceFetcher, requests};
use crate::model::{
    Affiliate, AffiliateListParams, AffiliateOrder, AffiliateStats, Customer, CustomerListParams,
    ModelId, Order, OrderListParams, Page, PageRequest, Product, ProductListParams, ProductPatch,
};
use crate::query::{Query, QueryClient, QueryState};
use crate::query_key::QueryKey;
use crate::retry::RetryPolicy;
use crate::transport::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub stale_time: Duration,
    pub popular_products_stale_time: Duration,
    /// Entries unused for this long are dropped by the garbage collector.
    pub gc_time: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for QuerySettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            stale_time: Duration::from_millis(config.stale_time_ms),
            popular_products_stale_time: Duration::from_millis(
                config.popular_products_stale_time_ms,
            ),
            gc_time: Duration::from_millis(config.gc_time_ms),
        }
    }
}

/// One step of a mutation's invalidation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Every key for this path, whatever its parameters.
    Path(&'static str),
    Key(QueryKey),
}

/// Keys made stale by a successful product update: all product list pages,
/// the product itself, and the popular-products list.
pub fn product_invalidation_plan(id: ModelId) -> Vec<Invalidation> {
    vec![
        Invalidation::Path(PRODUCTS_PATH),
        Invalidation::Key(requests::get_product(id).query_key()),
        Invalidation::Key(QueryKey::path_only(POPULAR_PRODUCTS_PATH)),
    ]
}

#[derive(Clone)]
pub struct DashboardHooks {
    client: QueryClient,
    fetcher: ResourceFetcher,
    settings: QuerySettings,
}

impl DashboardHooks {
    pub fn new(client: QueryClient, fetcher: ResourceFetcher, settings: QuerySettings) -> Self {
        Self {
            client,
            fetcher,
            settings,
        }
    }

    /// Wires a fresh cache around `transport` using the configured windows.
    pub fn from_config(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let client = QueryClient::new(QueryCache::new(), RetryPolicy::from(&config.retry));
        Self::new(
            client,
            ResourceFetcher::new(transport),
            QuerySettings::from(&config.cache),
        )
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    pub fn collect_garbage(&self) -> usize {
        self.client.cache().evict_idle(self.settings.gc_time)
    }

    /// Evicts idle entries every `gc_time` until the handle is aborted.
    pub fn spawn_garbage_collector(&self) -> JoinHandle<()> {
        let hooks = self.clone();
        let period = self.settings.gc_time.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = hooks.collect_garbage();
                if evicted > 0 {
                    debug!(evicted, "Collected idle queries");
                }
            }
        })
    }

    pub fn orders_query(&self, params: OrderListParams) -> Query<Page<Order>> {
        let key = requests::list_orders(&params).query_key();
        let fetcher = self.fetcher.clone();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let params = params.clone();
            async move { fetcher.list_orders(&params).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    pub fn order_query(&self, id: ModelId) -> Query<Option<Order>> {
        let fetcher = self.fetcher.clone();
        Query::new(requests::get_order(id).query_key(), move || {
            let fetcher = fetcher.clone();
            async move { fetcher.get_order(id).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    pub fn products_query(&self, params: ProductListParams) -> Query<Page<Product>> {
        let key = requests::list_products(&params).query_key();
        let fetcher = self.fetcher.clone();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let params = params.clone();
            async move { fetcher.list_products(&params).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    pub fn product_query(&self, id: ModelId) -> Query<Option<Product>> {
        let fetcher = self.fetcher.clone();
        Query::new(requests::get_product(id).query_key(), move || {
            let fetcher = fetcher.clone();
            async move { fetcher.get_product(id).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    pub fn popular_products_query(&self) -> Query<Vec<Product>> {
        let fetcher = self.fetcher.clone();
        Query::new(QueryKey::path_only(POPULAR_PRODUCTS_PATH), move || {
            let fetcher = fetcher.clone();
            async move { fetcher.list_popular_products().await }.boxed()
        })
        .stale_time(self.settings.popular_products_stale_time)
    }

    /// Customers never surface an error: after retries, any failure becomes an
    /// empty page with `success == false`.
    pub fn customers_query(&self, params: CustomerListParams) -> Query<Page<Customer>> {
        let key = requests::list_customers(&params).query_key();
        let label = key.to_string();
        let fetcher = self.fetcher.clone();
        let retry = self.client.retry_policy();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let params = params.clone();
            let label = label.clone();
            async move {
                let page = retry
                    .run(&label, || fetcher.list_customers(&params))
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "Failed to fetch customers; showing empty list");
                        Page::unsuccessful()
                    });
                Ok(page)
            }
            .boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    pub fn affiliates_query(&self, params: AffiliateListParams) -> Query<Page<Affiliate>> {
        let key = requests::list_affiliates(&params).query_key();
        let fetcher = self.fetcher.clone();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let params = params.clone();
            async move { fetcher.list_affiliates(&params).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
    }

    /// Disabled while `code` is blank.
    pub fn affiliate_orders_query(
        &self,
        code: &str,
        page: PageRequest,
    ) -> Query<Page<AffiliateOrder>> {
        let code = code.trim().to_string();
        let enabled = !code.is_empty();
        let key = requests::list_affiliate_orders(&code, page).query_key();
        let fetcher = self.fetcher.clone();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let code = code.clone();
            async move { fetcher.list_affiliate_orders(&code, page).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
        .enabled(enabled)
    }

    /// Disabled while `code` is blank.
    pub fn affiliate_stats_query(&self, code: &str) -> Query<AffiliateStats> {
        let code = code.trim().to_string();
        let enabled = !code.is_empty();
        let key = requests::get_affiliate_stats(&code).query_key();
        let fetcher = self.fetcher.clone();
        Query::new(key, move || {
            let fetcher = fetcher.clone();
            let code = code.clone();
            async move { fetcher.get_affiliate_stats(&code).await }.boxed()
        })
        .stale_time(self.settings.stale_time)
        .enabled(enabled)
    }

    pub async fn orders(&self, params: OrderListParams) -> QueryState<Page<Order>> {
        self.client.fetch(&self.orders_query(params)).await
    }

    pub async fn order(&self, id: ModelId) -> QueryState<Option<Order>> {
        self.client.fetch(&self.order_query(id)).await
    }

    pub async fn products(&self, params: ProductListParams) -> QueryState<Page<Product>> {
        self.client.fetch(&self.products_query(params)).await
    }

    pub async fn product(&self, id: ModelId) -> QueryState<Option<Product>> {
        self.client.fetch(&self.product_query(id)).await
    }

    pub async fn popular_products(&self) -> QueryState<Vec<Product>> {
        self.client.fetch(&self.popular_products_query()).await
    }

    pub async fn customers(&self, params: CustomerListParams) -> QueryState<Page<Customer>> {
        self.client.fetch(&self.customers_query(params)).await
    }

    pub async fn affiliates(&self, params: AffiliateListParams) -> QueryState<Page<Affiliate>> {
        self.client.fetch(&self.affiliates_query(params)).await
    }

    pub async fn affiliate_orders(
        &self,
        code: &str,
        page: PageRequest,
    ) -> QueryState<Page<AffiliateOrder>> {
        self.client.fetch(&self.affiliate_orders_query(code, page)).await
    }

    pub async fn affiliate_stats(&self, code: &str) -> QueryState<AffiliateStats> {
        self.client.fetch(&self.affiliate_stats_query(code)).await
    }

    /// Sends the patch, then invalidates per [`product_invalidation_plan`].
    /// Mutations are not retried; a rejected update is returned as
    /// `FetchError::Validation` carrying the server's message.
    pub async fn update_product(&self, patch: &ProductPatch) -> FetchResult<Product> {
        let product = self.fetcher.update_product(patch).await?;

        let cache = self.client.cache();
        let mut invalidated = 0;
        for step in product_invalidation_plan(patch.id) {
            invalidated += match step {
                Invalidation::Path(path) => cache.invalidate_path(path),
                Invalidation::Key(key) => usize::from(cache.invalidate(&key)),
            };
        }

        info!(product_id = product.id, invalidated, "Updated product");
        Ok(product)
    }
}

//! Data layer of the shop admin dashboard: REST fetchers for orders,
//! products, customers and affiliates behind a shared, single-flight query
//! cache with staleness windows, retries and mutation-driven invalidation.

pub mod cache;
pub mod error;
pub mod executable_utils;
pub mod fetcher;
pub mod hooks;
pub mod model;
pub mod payments;
pub mod query;
pub mod query_key;
pub mod retry;
pub mod transport;
pub mod widgets;

pub use cache::{CacheEvent, QueryCache, QueryState};
pub use error::{FetchError, FetchResult};
pub use hooks::DashboardHooks;
pub use query::{Query, QueryClient};
pub use query_key::QueryKey;

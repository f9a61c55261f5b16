//! Shared query cache.
//!
//! One [`QueryCache`] is constructed per process (or per session) and cloned
//! into whoever needs it. Entries are addressed by [`QueryKey`] and hold
//! type-erased values; typed access downcasts on the way out.
//!
//! Guarantees:
//! - at most one outstanding fetch per key; concurrent callers share it,
//! - a fetch whose callers have all gone away is aborted,
//! - invalidation detaches a running fetch so its (possibly pre-mutation)
//!   result never overwrites the entry,
//! - failures are not cached and leave earlier data in place.

mod flight;
mod state;

pub use state::QueryState;

use metrics::counter;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::query_key::QueryKey;
use flight::{Flight, FlightGuard, FlightOutcome};

pub type CachedValue = Arc<dyn Any + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Removed(QueryKey),
    Failed(QueryKey),
    Cancelled(QueryKey),
}

struct CacheEntry {
    value: CachedValue,
    updated_at: Instant,
    last_accessed: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(value: CachedValue, now: Instant) -> Self {
        Self {
            value,
            updated_at: now,
            last_accessed: now,
            invalidated: false,
        }
    }

    fn is_fresh(&self, now: Instant, stale_time: Duration) -> bool {
        !self.invalidated && now.duration_since(self.updated_at) < stale_time
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    flights: HashMap<QueryKey, Flight>,
    /// Flights cut loose by invalidation, by id; they only serve their waiters.
    detached: HashMap<u64, Flight>,
}

impl CacheState {
    fn detach(&mut self, key: &QueryKey) -> bool {
        match self.flights.remove(key) {
            Some(flight) => {
                self.detached.insert(flight.id, flight);
                true
            }
            None => false,
        }
    }

    fn flight_mut(&mut self, key: &QueryKey, id: u64) -> Option<&mut Flight> {
        match self.flights.get_mut(key) {
            Some(flight) if flight.id == id => Some(flight),
            _ => self.detached.get_mut(&id),
        }
    }

    /// Removes the flight `id` for `key` from whichever table holds it.
    fn take_flight(&mut self, key: &QueryKey, id: u64) -> Option<Flight> {
        if self.flights.get(key).is_some_and(|flight| flight.id == id) {
            self.flights.remove(key)
        } else {
            self.detached.remove(&id)
        }
    }
}

struct CacheInner {
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
    next_flight_id: AtomicU64,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState::default()),
                events,
                next_flight_id: AtomicU64::new(1),
            }),
        }
    }

    // The lock is never held across an await, so a poisoned state is still consistent.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Returns the cached value for `key` if it is younger than `stale_time`
    /// and not invalidated; otherwise joins or starts the fetch for `key`.
    ///
    /// `fetch` is only called when this caller starts a new flight.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetch: F,
    ) -> FetchResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let (mut outcome, guard, leader) = {
            let mut state = self.lock();
            let now = Instant::now();

            if let Some(entry) = state.entries.get_mut(key) {
                if entry.is_fresh(now, stale_time) {
                    entry.last_accessed = now;
                    counter!("dashboard_cache_hits_total", "resource" => key.resource().to_string())
                        .increment(1);
                    debug!(%key, "Serving query from cache");
                    return downcast(entry.value.clone(), key);
                }
            }

            if let Some(flight) = state.flights.get_mut(key) {
                flight.waiters += 1;
                counter!("dashboard_cache_coalesced_total", "resource" => key.resource().to_string())
                    .increment(1);
                debug!(%key, waiters = flight.waiters, "Joining in-flight fetch");
                (
                    flight.outcome.clone(),
                    FlightGuard::new(self.clone(), key.clone(), flight.id),
                    None,
                )
            } else {
                counter!("dashboard_cache_misses_total", "resource" => key.resource().to_string())
                    .increment(1);
                let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel::<FlightOutcome>(None);
                state.flights.insert(
                    key.clone(),
                    Flight {
                        id,
                        waiters: 1,
                        outcome: rx.clone(),
                        abort: None,
                    },
                );
                (rx, FlightGuard::new(self.clone(), key.clone(), id), Some((id, tx)))
            }
        };

        // The flight is reserved; `fetch` runs unlocked so it may read the cache.
        if let Some((id, tx)) = leader {
            let future = fetch();
            let cache = self.clone();
            let task_key = key.clone();
            let handle = tokio::spawn(async move {
                let result = future.await.map(|value| Arc::new(value) as CachedValue);
                cache.complete(&task_key, id, result, tx);
            });
            self.attach_task(key, id, handle.abort_handle());
            debug!(%key, flight = id, "Started fetch");
        }

        let result = outcome
            .wait_for(Option::is_some)
            .await
            .map(|outcome| (*outcome).clone());
        drop(guard);

        match result {
            Ok(Some(Ok(value))) => downcast(value, key),
            Ok(Some(Err(e))) => Err(e),
            // The fetch task went away without answering (aborted or panicked).
            Ok(None) | Err(_) => Err(FetchError::Cancelled),
        }
    }

    fn complete(
        &self,
        key: &QueryKey,
        id: u64,
        result: FetchResult<CachedValue>,
        tx: watch::Sender<FlightOutcome>,
    ) {
        let event = {
            let mut state = self.lock();
            let current = state.flights.get(key).is_some_and(|flight| flight.id == id);
            if current {
                state.flights.remove(key);
                match &result {
                    Ok(value) => {
                        state
                            .entries
                            .insert(key.clone(), CacheEntry::new(value.clone(), Instant::now()));
                        Some(CacheEvent::Updated(key.clone()))
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "Query fetch failed");
                        Some(CacheEvent::Failed(key.clone()))
                    }
                }
            } else {
                state.detached.remove(&id);
                debug!(%key, flight = id, "Discarding result of detached fetch");
                None
            }
        };

        tx.send_replace(Some(result));
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn attach_task(&self, key: &QueryKey, id: u64, abort: AbortHandle) {
        let mut state = self.lock();
        if let Some(flight) = state.flight_mut(key, id) {
            flight.abort = Some(abort);
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let state = self.lock();
        let entry = state.entries.get(key)?;
        entry.value.clone().downcast::<T>().ok()
    }

    /// Stores `value` as a fresh entry, replacing whatever was cached.
    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        {
            let mut state = self.lock();
            state
                .entries
                .insert(key.clone(), CacheEntry::new(Arc::new(value), Instant::now()));
        }
        self.emit(CacheEvent::Updated(key.clone()));
    }

    /// Marks the entry stale and detaches any running fetch, so the next
    /// access issues a new request. Returns whether anything was affected.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let affected = {
            let mut state = self.lock();
            let detached = state.detach(key);
            let marked = match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.invalidated = true;
                    true
                }
                None => false,
            };
            detached || marked
        };
        if affected {
            debug!(%key, "Invalidated query");
            self.emit(CacheEvent::Invalidated(key.clone()));
        }
        affected
    }

    /// Invalidates every key addressing `path`, whatever its parameters.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let keys: Vec<QueryKey> = {
            let state = self.lock();
            let mut keys: Vec<QueryKey> = state
                .entries
                .keys()
                .chain(state.flights.keys())
                .filter(|key| key.has_path(path))
                .cloned()
                .collect();
            keys.sort();
            keys.dedup();
            keys
        };
        keys.iter().filter(|key| self.invalidate(key)).count()
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.lock().entries.remove(key).is_some();
        if removed {
            self.emit(CacheEvent::Removed(key.clone()));
        }
        removed
    }

    /// Drops every entry and detaches every running fetch. Detached fetches
    /// still answer (or are cancelled with) their current callers.
    pub fn clear(&self) {
        let keys: Vec<QueryKey> = {
            let mut state = self.lock();
            let running: Vec<QueryKey> = state.flights.keys().cloned().collect();
            for key in &running {
                state.detach(key);
            }
            state.entries.drain().map(|(key, _)| key).collect()
        };
        for key in keys {
            self.emit(CacheEvent::Removed(key));
        }
    }

    /// Removes entries not read or written for `gc_time`; keys with a running
    /// fetch are kept.
    pub fn evict_idle(&self, gc_time: Duration) -> usize {
        let now = Instant::now();
        let evicted: Vec<QueryKey> = {
            let mut state = self.lock();
            let CacheState { entries, flights, .. } = &mut *state;
            let idle: Vec<QueryKey> = entries
                .iter()
                .filter(|(key, entry)| {
                    !flights.contains_key(*key) && now.duration_since(entry.last_accessed) >= gc_time
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &idle {
                entries.remove(key);
            }
            idle
        };
        for key in &evicted {
            debug!(%key, "Evicted idle query");
            self.emit(CacheEvent::Removed(key.clone()));
        }
        evicted.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().flights.contains_key(key)
    }

    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(Instant::now(), stale_time))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of `key` without triggering a fetch.
    pub fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let state = self.lock();
        let data = state
            .entries
            .get(key)
            .and_then(|entry| entry.value.clone().downcast::<T>().ok());
        let is_fetching = state.flights.contains_key(key);
        QueryState {
            is_loading: is_fetching && data.is_none(),
            is_fetching,
            data,
            error: None,
        }
    }
}

fn downcast<T: Send + Sync + 'static>(value: CachedValue, key: &QueryKey) -> FetchResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| FetchError::TypeMismatch(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(page: &str) -> QueryKey {
        QueryKey::new("/api/products", [("page", page)])
    }

    #[tokio::test]
    async fn set_then_get_round_trips_typed_value() {
        let cache = QueryCache::new();
        cache.set(&key("1"), vec![1u32, 2, 3]);
        assert_eq!(cache.get::<Vec<u32>>(&key("1")).as_deref(), Some(&vec![1, 2, 3]));
        assert!(cache.get::<String>(&key("1")).is_none());
        assert!(cache.get::<Vec<u32>>(&key("2")).is_none());
    }

    #[tokio::test]
    async fn type_mismatch_is_reported_on_fresh_hit() {
        let cache = QueryCache::new();
        cache.set(&key("1"), 5u8);
        let result = cache
            .fetch::<String, _, _>(&key("1"), Duration::from_secs(60), || async {
                Ok("unused".to_string())
            })
            .await;
        assert!(matches!(result, Err(FetchError::TypeMismatch(_))));
    }

    #[tokio::test]
    async fn invalidate_path_only_touches_matching_keys() {
        let cache = QueryCache::new();
        cache.set(&key("1"), 1u8);
        cache.set(&key("2"), 2u8);
        cache.set(&QueryKey::path_only("/api/orders"), 3u8);

        assert_eq!(cache.invalidate_path("/api/products"), 2);
        assert!(!cache.is_fresh(&key("1"), Duration::from_secs(60)));
        assert!(cache.is_fresh(&QueryKey::path_only("/api/orders"), Duration::from_secs(60)));
        // Stale entries still serve reads through `get`.
        assert_eq!(cache.get::<u8>(&key("2")).as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn remove_and_clear_emit_events() {
        let cache = QueryCache::new();
        let mut events = cache.subscribe();
        cache.set(&key("1"), 1u8);
        assert!(cache.remove(&key("1")));
        assert!(!cache.remove(&key("1")));
        cache.set(&key("2"), 2u8);
        cache.clear();

        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key("1")));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Removed(key("1")));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key("2")));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Removed(key("2")));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted() {
        let cache = QueryCache::new();
        cache.set(&key("1"), 1u8);
        tokio::time::advance(Duration::from_secs(120)).await;
        cache.set(&key("2"), 2u8);

        assert_eq!(cache.evict_idle(Duration::from_secs(60)), 1);
        assert!(cache.get::<u8>(&key("1")).is_none());
        assert!(cache.get::<u8>(&key("2")).is_some());
    }
}

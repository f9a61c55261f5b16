use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::debug;

use super::{CacheEvent, CachedValue, QueryCache};
use crate::error::FetchError;
use crate::query_key::QueryKey;

pub(super) type FlightOutcome = Option<Result<CachedValue, FetchError>>;

/// The single outstanding fetch for a key. `abort` is set once the fetch
/// task has been spawned.
pub(super) struct Flight {
    pub id: u64,
    pub waiters: usize,
    pub outcome: watch::Receiver<FlightOutcome>,
    pub abort: Option<AbortHandle>,
}

/// Held by each caller waiting on a flight. Dropping the last guard of an
/// unfinished flight aborts its fetch.
pub(super) struct FlightGuard {
    cache: QueryCache,
    key: QueryKey,
    id: u64,
}

impl FlightGuard {
    pub fn new(cache: QueryCache, key: QueryKey, id: u64) -> Self {
        Self { cache, key, id }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let cancelled = {
            let mut state = self.cache.lock();
            // Current or detached alike; a finished flight is in neither table.
            let Some(flight) = state.flight_mut(&self.key, self.id) else {
                return;
            };
            flight.waiters = flight.waiters.saturating_sub(1);
            if flight.waiters > 0 {
                return;
            }
            state.take_flight(&self.key, self.id)
        };

        if let Some(flight) = cancelled {
            if let Some(abort) = flight.abort {
                abort.abort();
            }
            debug!(key = %self.key, flight = self.id, "Cancelled fetch with no remaining waiters");
            self.cache.emit(CacheEvent::Cancelled(self.key.clone()));
        }
    }
}

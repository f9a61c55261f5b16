use std::sync::Arc;

use crate::error::FetchError;

/// What a caller sees for one query: the data (if any), whether a request is
/// running, and the last error.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    /// No data yet and a request is running.
    pub is_loading: bool,
    /// A request is running, with or without data.
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            error: self.error.clone(),
        }
    }
}

impl<T> QueryState<T> {
    /// Disabled query or nothing requested yet.
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetching: false,
            error: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            is_fetching: true,
            ..Self::idle()
        }
    }

    pub fn success(data: Arc<T>) -> Self {
        Self {
            data: Some(data),
            ..Self::idle()
        }
    }

    /// Failed request; data from an earlier success is kept.
    pub fn failure(error: FetchError, previous: Option<Arc<T>>) -> Self {
        Self {
            data: previous,
            error: Some(error),
            ..Self::idle()
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }
}

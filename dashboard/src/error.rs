use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of a fetcher or mutation.
///
/// `Clone` because one failed flight is handed to every waiter sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request to {path} failed with status {status}")]
    Status { status: u16, path: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("{message}")]
    Validation { status: u16, message: String },

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("request was cancelled")]
    Cancelled,

    #[error("cached value for {0} has an unexpected type")]
    TypeMismatch(String),
}

impl FetchError {
    /// Network failures and server-side (5xx) statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

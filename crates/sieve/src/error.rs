use reqwest::StatusCode;
use std::time::Duration;

// Error type for a split run. Every variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum SieveError {
    #[error("HTTP error: {0}")]
    Retrieval(#[from] reqwest::Error),

    #[error("Server returned status code {0}")]
    Status(StatusCode),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No data received within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid proxy configuration: {0}")]
    Proxy(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl SieveError {
    /// Whether the run stalled waiting for the source.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SieveError::Timeout(_))
    }

    pub(crate) fn from_transfer(err: reqwest::Error, read_timeout: Duration) -> Self {
        if err.is_timeout() {
            SieveError::Timeout(read_timeout)
        } else {
            SieveError::Retrieval(err)
        }
    }
}

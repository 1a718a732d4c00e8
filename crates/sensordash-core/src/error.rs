//! Error types for the sensor dashboard core.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching a reading from a data source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Failure injected by a fault-injecting source.
    #[error("injected fetch failure")]
    Injected,

    /// Failure reported by a backend integration.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors that can occur when driving the poller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollerError {
    /// `start` was called while the poller was already polling.
    #[error("poller is already running")]
    AlreadyRunning,

    /// Poll interval must be non-zero.
    #[error("invalid poll interval: {0:?}")]
    InvalidInterval(std::time::Duration),
}

/// Top-level error for the core library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Poller misuse.
    #[error("poller error: {0}")]
    Poller(#[from] PollerError),

    /// Invalid failure rate (must be within 0.0..=1.0).
    #[error("invalid failure rate (must be 0.0-1.0): {0}")]
    InvalidFailureRate(f64),
}

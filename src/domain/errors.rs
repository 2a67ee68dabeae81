//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Source wiki error: {0}")]
    Source(String),

    #[error("Target wiki error: {0}")]
    Target(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limited: caller should retry after `seconds` seconds.
    /// The retry executor sleeps the server-directed wait instead of backoff.
    #[error("Rate limited: retry after {seconds} seconds")]
    RateLimited { seconds: u64 },

    #[error("State error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report error: {0}")]
    Report(String),
}

//! Cross-cutting concerns. Configuration and the retry policy.

pub mod config;
pub mod retry;

pub use config::AppConfig;
pub use retry::{RetryPolicy, is_retryable, retry};

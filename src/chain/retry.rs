//! Retry logic utilities for chain operations
//!
//! Helper functions for exponential backoff and timeout wrapping around
//! calls made through the chain capability.

use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::errors::{ChainError, ChainResult};

/// Calculate next backoff duration using exponential backoff with a maximum cap
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use delegation_engine::chain::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

/// Run a chain future under a timeout
pub async fn execute_with_timeout<T, F>(timeout_seconds: u64, operation: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    timeout(Duration::from_secs(timeout_seconds), operation).await
}

/// Retry a chain operation on transient failures
///
/// Each attempt runs under `config.timeout_seconds`. Non-retryable errors are
/// returned immediately; exhausting `config.max_retries` yields
/// `MaxRetriesExceeded` (or `Timeout` if the last attempt timed out).
pub async fn with_retry<T, F, Fut>(
    config: &ConnectionConfig,
    operation_name: &str,
    mut operation: F,
) -> ChainResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ChainResult<T>>,
{
    let max_retries = config.max_retries.max(1);
    let mut attempts = 0;
    let mut backoff = Duration::from_millis(config.initial_backoff_ms);

    loop {
        let outcome = execute_with_timeout(config.timeout_seconds, operation()).await;
        attempts += 1;

        let err = match outcome {
            Ok(Ok(value)) => {
                if attempts > 1 {
                    debug!("{} succeeded after {} attempts", operation_name, attempts);
                }
                return Ok(value);
            }
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => ChainError::Timeout {
                timeout_seconds: config.timeout_seconds,
                operation: operation_name.to_string(),
            },
        };

        if attempts >= max_retries {
            error!(
                "{} failed after {} attempts: {}",
                operation_name, attempts, err
            );
            return Err(match err {
                ChainError::Timeout { .. } => err,
                _ => ChainError::MaxRetriesExceeded {
                    operation: operation_name.to_string(),
                },
            });
        }

        warn!(
            "{} attempt {} failed, retrying in {:?}: {}",
            operation_name, attempts, backoff, err
        );
        sleep(backoff).await;
        backoff = calculate_next_backoff(
            backoff,
            config.backoff_multiplier,
            config.max_backoff_seconds,
        );
    }
}

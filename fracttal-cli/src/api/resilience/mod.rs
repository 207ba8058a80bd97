//! Resilience features for Fracttal API calls
//!
//! Currently a fixed-delay retry for transport failures.

pub mod config;

pub use config::RetryConfig;

use log::debug;
use std::future::Future;

/// Run `op` until it succeeds or the configured attempts are exhausted.
///
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_attempts => {
                debug!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    what, attempt, config.max_attempts, e, config.delay
                );
                tokio::time::sleep(config.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

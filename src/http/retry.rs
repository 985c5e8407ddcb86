//! Retry configuration for HTTP collaborators.

use backon::ExponentialBuilder;
use std::time::Duration;

/// Configuration for retrying failed requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts including the initial request.
    pub attempts: usize,
    /// Base delay for the exponential backoff.
    pub base_delay: Duration,
    /// Whether to jitter the backoff delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt with no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }
}

/// Build an exponential backoff retry builder from the given configuration.
///
/// `attempts` counts the first request, so `attempts = 1` yields a builder
/// that never retries.
///
/// # Examples
/// ```
/// use backon::BackoffBuilder;
/// use revk::http::retry::{RetryConfig, build_retry_builder};
///
/// let builder = build_retry_builder(RetryConfig::none());
/// assert_eq!(builder.build().count(), 0);
/// ```
#[must_use]
pub fn build_retry_builder(config: RetryConfig) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(config.base_delay)
        .with_max_times(config.attempts.saturating_sub(1));
    if config.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}

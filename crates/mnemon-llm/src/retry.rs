//! Timed retry of model calls.
//!
//! A [`RetryPolicy`] is a fixed schedule of delays. A call is attempted once,
//! then once more after each delay, for as long as it fails with a retryable
//! [`LlmError`]. The policy is passed in by the caller, so tests run with an
//! empty or millisecond schedule instead of patching shared state.

use std::future::Future;
use std::time::Duration;

use mnemon_settings::RetrySettings;
use tracing::warn;

use crate::errors::LlmError;

/// Delays between attempts of a model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Retry after each of `delays`, in order.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Schedule from the `retry` settings section.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings
                .delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        )
    }

    /// The delay schedule.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Attempts made before giving up.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ])
    }
}

/// Run `op`, retrying retryable failures on `policy`'s schedule.
///
/// A rate-limit hint longer than the scheduled delay replaces it. Returns the
/// first success, the first non-retryable error, or the last error once the
/// schedule is exhausted.
pub async fn retry_with_policy<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut schedule = policy.delays.iter().copied();
    let mut attempt = 1_usize;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !err.is_retryable() {
            return Err(err);
        }
        let Some(scheduled) = schedule.next() else {
            return Err(err);
        };

        let delay = err.suggested_delay().map_or(scheduled, |d| d.max(scheduled));
        warn!(
            attempt,
            max_attempts = policy.max_attempts(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            kind = err.error_kind(),
            error = %err,
            "model call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

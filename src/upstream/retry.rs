//! Bounded exponential backoff
//!
//! Only for idempotent calls. Balance writes are retried by the order
//! workflow itself, keyed by op id, never through this helper.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_millis(50),
            max: Duration::from_millis(1000),
        }
    }
}

impl Backoff {
    pub fn new(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            max,
        }
    }

    /// No waiting and a single attempt
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Run `call` until it succeeds, fails with a non-transient error, or the
/// attempts run out.
pub async fn retry_idempotent<T, F, Fut>(
    backoff: Backoff,
    what: &'static str,
    mut call: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Err(e) if e.is_transient() && attempt < backoff.max_attempts => {
                let delay = backoff.delay(attempt);
                warn!(
                    call = what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Upstream call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_caps() {
        let b = Backoff::new(5, Duration::from_millis(10), Duration::from_millis(35));
        assert_eq!(b.delay(1), Duration::from_millis(10));
        assert_eq!(b.delay(2), Duration::from_millis(20));
        assert_eq!(b.delay(3), Duration::from_millis(35));
        assert_eq!(b.delay(40), Duration::from_millis(35));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let b = Backoff::new(3, Duration::from_millis(1), Duration::from_millis(2));

        let result = retry_idempotent(b, "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(UpstreamError::Timeout)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let b = Backoff::new(2, Duration::from_millis(1), Duration::from_millis(1));

        let result: Result<(), _> = retry_idempotent(b, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Transport("reset".into()))
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_errors_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = retry_idempotent(Backoff::default(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::NotFound("nobody".into()))
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

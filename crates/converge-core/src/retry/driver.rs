// # Retry Driver
//
// Bounded retry loop around a fallible attempt.
//
// The driver owns all retry policy: attempts are repeated with bounded
// exponential backoff until the attempt succeeds, fails permanently, or the
// overall deadline elapses. There is no attempt-count limit; short-lived
// remote lock contention is expected to clear within seconds to low minutes,
// and the deadline is the only bound.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::classifier::{Classification, RetryClassifier};
use crate::error::{Error, Result};

/// Backoff and deadline settings for [`retry_until`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Overall deadline; once elapsed, the last transient error surfaces
    /// wrapped in [`Error::Timeout`]
    pub timeout: Duration,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
    /// Backoff growth factor per attempt
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy with the given deadline and default backoff spacing
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Repeat `attempt` until it succeeds, fails permanently, or the policy
/// deadline elapses.
///
/// Each failure is classified by `classifier`:
///
/// - `Permanent`: the error is returned immediately, no further attempts.
/// - `Retryable`: the driver sleeps (bounded exponential backoff) and tries
///   again, unless the next attempt would start past the deadline, in which
///   case [`Error::Timeout`] wrapping the last transient error is returned.
///
/// The attempt future is created fresh for every try, so attempts observe no
/// state from previous tries other than what the caller's closure captures.
pub async fn retry_until<T, F, Fut>(
    policy: &RetryPolicy,
    classifier: &RetryClassifier,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut delay = policy.initial_delay;
    let mut attempts: usize = 0;

    loop {
        attempts += 1;
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match classifier.classify(&err) {
            Classification::Permanent => {
                debug!("permanent failure on attempt {}: {}", attempts, err);
                return Err(err);
            }
            Classification::Retryable => {
                if Instant::now() + delay >= deadline {
                    let elapsed = started.elapsed();
                    warn!(
                        "giving up after {} attempts over {:?}: {}",
                        attempts, elapsed, err
                    );
                    return Err(Error::timeout(elapsed, err));
                }
                debug!(
                    "transient failure on attempt {}, retrying in {:?}: {}",
                    attempts, delay, err
                );
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let policy = RetryPolicy::default();
        let classifier = RetryClassifier::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<u32> = retry_until(&policy, &classifier, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_error_stops_after_one_attempt() {
        let policy = RetryPolicy::default();
        let classifier = RetryClassifier::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<u32> = retry_until(&policy, &classifier, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::invalid_input("bad identifier")) }
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let policy = RetryPolicy::new(Duration::from_secs(60));
        let classifier = RetryClassifier::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<&str> = retry_until(&policy, &classifier, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(Error::api("domain example.com is locked"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_surfaces_timeout_wrapping_last_error() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        };
        let classifier = RetryClassifier::new();
        let started = Instant::now();

        let result: Result<u32> = retry_until(&policy, &classifier, || async {
            Err(Error::api("DNS Entries are currently being saved"))
        })
        .await;

        // Bounded: gives up no later than the deadline
        assert!(started.elapsed() <= Duration::from_secs(6));
        match result {
            Err(Error::Timeout { source, .. }) => {
                assert!(source.to_string().contains("currently being saved"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_bounded_by_max_delay() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(30),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            multiplier: 10.0,
        };
        let classifier = RetryClassifier::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<u32> = retry_until(&policy, &classifier, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::api("domain is locked")) }
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        // 1s + 4s + 4s + ... within 30s: far more than two attempts means the
        // 10x multiplier was clamped
        assert!(attempts.load(Ordering::SeqCst) > 4);
    }
}

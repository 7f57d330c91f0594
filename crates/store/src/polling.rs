//! Bounded polling: repeated fetch attempts at a fixed interval until a
//! bundle appears or a wall-clock deadline passes. Timing out is a normal
//! outcome ("not ready yet"), not an error, so callers can distinguish it
//! from a broken store and retry the whole operation later.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Result;
use crate::StoredBundle;

/// Floor for the poll interval. A zero or negative interval from a caller
/// must not turn the wait loop into a busy spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct AwaitOutcome {
    pub found: bool,
    pub bundle: Option<StoredBundle>,
    pub attempts: u32,
    pub waited: Duration,
}

/// Poll `fetch` until it yields a bundle or `timeout` elapses.
///
/// The first attempt happens immediately; even `timeout < poll_interval`
/// performs exactly one fetch before declaring timeout. The loop never
/// retries after success and never sleeps past the deadline. Cancellation is
/// the caller's: dropping the returned future mid-sleep cancels cleanly.
pub async fn await_bundle<F, Fut>(
    mut fetch: F,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<AwaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<StoredBundle>>>,
{
    let interval = poll_interval.max(MIN_POLL_INTERVAL);
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(bundle) = fetch().await? {
            return Ok(AwaitOutcome {
                found: true,
                bundle: Some(bundle),
                attempts,
                waited: start.elapsed(),
            });
        }

        if Instant::now() + interval > deadline {
            break;
        }
        tokio::time::sleep(interval).await;
    }

    Ok(AwaitOutcome {
        found: false,
        bundle: None,
        attempts,
        waited: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn stored() -> StoredBundle {
        StoredBundle {
            uri: "file:///tmp/inc_1.json".to_string(),
            raw: serde_json::json!({"incident_id": "inc_1"}),
        }
    }

    /// Fetch that fails `misses` times before succeeding forever after.
    fn flaky(misses: u32) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Result<Option<StoredBundle>>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let fetch = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(Ok(if n > misses { Some(stored()) } else { None }))
        };
        (calls, fetch)
    }

    #[tokio::test(start_paused = true)]
    async fn found_on_third_attempt() {
        let (calls, fetch) = flaky(2);
        let outcome = await_bundle(fetch, Duration::from_secs(10), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(outcome.found);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(outcome.bundle.is_some());
        // Two sleeps of 1s each before the successful fetch.
        assert_eq!(outcome.waited, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_bounded_and_not_an_error() {
        let (calls, fetch) = flaky(u32::MAX);
        let start = Instant::now();
        let outcome = await_bundle(fetch, Duration::from_secs(3), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(!outcome.found);
        assert!(outcome.bundle.is_none());
        assert!(outcome.attempts <= 4, "attempts = {}", outcome.attempts);
        assert_eq!(calls.load(Ordering::SeqCst), outcome.attempts);
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_shorter_than_interval_still_fetches_once() {
        let (calls, fetch) = flaky(u32::MAX);
        let outcome = await_bundle(fetch, Duration::from_millis(50), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!outcome.found);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped() {
        let (calls, fetch) = flaky(u32::MAX);
        let outcome = await_bundle(fetch, Duration::from_secs(1), Duration::ZERO)
            .await
            .unwrap();

        // 1s budget at the 100ms floor: at most 11 attempts, not thousands.
        assert!(!outcome.found);
        assert!(outcome.attempts <= 11, "attempts = {}", outcome.attempts);
        assert_eq!(calls.load(Ordering::SeqCst), outcome.attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn no_fetch_after_success() {
        let (calls, fetch) = flaky(0);
        let outcome = await_bundle(fetch, Duration::from_secs(10), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(outcome.found);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_error_propagates() {
        let fetch = || {
            std::future::ready(Err::<Option<StoredBundle>, _>(
                crate::StoreError::UpstreamStatus {
                    status: 503,
                    uri: "s3://bucket/evidence/v1/inc_1.json".to_string(),
                },
            ))
        };
        let err = await_bundle(fetch, Duration::from_secs(3), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}

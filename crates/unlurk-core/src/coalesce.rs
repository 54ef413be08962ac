//! Single-flight fetch with a short-lived result cache.
//!
//! At most one underlying operation runs at a time. Callers arriving while it is in
//! flight await the same shared future and receive the same result or error. A
//! successful result is kept for `ttl`; failures are never cached.
//!
//! The shared future only makes progress while someone awaits it. When the last waiter
//! goes away mid-fetch the fetch is dropped and unregistered, so a later caller starts
//! afresh instead of resuming it with stale inputs.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::clock::{elapsed, Clock};
use crate::error::{UnlurkError, UnlurkResult};

type SharedFetch<T> = Shared<BoxFuture<'static, UnlurkResult<T>>>;

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

struct InFlight<T> {
    generation: u64,
    future: SharedFetch<T>,
    waiters: usize,
}

struct State<T> {
    cached: Option<Cached<T>>,
    in_flight: Option<InFlight<T>>,
    generation: u64,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<T: Clone> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn complete(&self, generation: u64, result: &UnlurkResult<T>) {
        let mut state = self.lock();
        if state.in_flight.as_ref().map(|f| f.generation) != Some(generation) {
            return;
        }
        state.in_flight = None;

        if let Ok(value) = result {
            state.cached = Some(Cached {
                value: value.clone(),
                fetched_at: self.clock.now(),
            });
        }
    }

    /// A waiter on `generation` went away; unregister the fetch once nobody is left.
    fn release(&self, generation: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(in_flight) = state.in_flight.as_mut() else {
            return;
        };
        if in_flight.generation != generation {
            return;
        }

        in_flight.waiters = in_flight.waiters.saturating_sub(1);
        if in_flight.waiters == 0 {
            debug!(generation, "in-flight fetch abandoned by all waiters");
            state.in_flight = None;
        }
    }
}

/// Held by each caller awaiting a shared fetch.
struct WaiterGuard<'a, T: Clone> {
    inner: &'a Inner<T>,
    generation: u64,
}

impl<T: Clone> Drop for WaiterGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.release(self.generation);
    }
}

/// Coalesced, TTL-cached fetch of a single value.
pub struct CoalescedFetch<T> {
    inner: Arc<Inner<T>>,
    deadline: Option<Duration>,
}

impl<T> CoalescedFetch<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    cached: None,
                    in_flight: None,
                    generation: 0,
                }),
                clock,
                ttl,
            }),
            deadline: None,
        }
    }

    /// Bound every underlying operation by `deadline`.
    ///
    /// When it fires, all waiters receive the same [`UnlurkError::Cancelled`].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Return the cached value if still fresh, otherwise join or start the underlying fetch.
    ///
    /// `op` is only invoked when this call starts a new fetch.
    pub async fn fetch<F, Fut>(&self, op: F) -> UnlurkResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UnlurkResult<T>> + Send + 'static,
    {
        let (generation, shared) = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;

            if let Some(cached) = &state.cached {
                if elapsed(cached.fetched_at, self.inner.clock.now()) < self.inner.ttl {
                    debug!("coalesced fetch served from cache");
                    return Ok(cached.value.clone());
                }
            }

            match state.in_flight.as_mut() {
                Some(in_flight) => {
                    debug!(generation = in_flight.generation, "joining in-flight fetch");
                    in_flight.waiters += 1;
                    (in_flight.generation, in_flight.future.clone())
                }
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let future = self.start(generation, op());
                    state.in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                        waiters: 1,
                    });
                    (generation, future)
                }
            }
        };

        let _guard = WaiterGuard {
            inner: &self.inner,
            generation,
        };
        shared.await
    }

    fn start<Fut>(&self, generation: u64, fut: Fut) -> SharedFetch<T>
    where
        Fut: Future<Output = UnlurkResult<T>> + Send + 'static,
    {
        // Weak so a pending in-flight future does not keep the fetcher alive.
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let deadline = self.deadline;

        async move {
            let result = match deadline {
                Some(after) => match tokio::time::timeout(after, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(UnlurkError::Cancelled { after }),
                },
                None => fut.await,
            };

            if let Some(inner) = inner.upgrade() {
                inner.complete(generation, &result);
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Cached value, if any, regardless of freshness.
    pub fn cached(&self) -> Option<(T, DateTime<Utc>)> {
        self.inner
            .lock()
            .cached
            .as_ref()
            .map(|c| (c.value.clone(), c.fetched_at))
    }

    /// Whether a fetch is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    /// Forget the cached value so the next call fetches.
    pub fn invalidate(&self) {
        self.inner.lock().cached = None;
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

impl<T> std::fmt::Debug for CoalescedFetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescedFetch")
            .field("ttl", &self.inner.ttl)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_fetcher() -> (CoalescedFetch<u64>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        (
            CoalescedFetch::new(clock.clone(), Duration::from_secs(60)),
            clock,
        )
    }

    fn counting_op(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        result: UnlurkResult<u64>,
    ) -> impl FnOnce() -> BoxFuture<'static, UnlurkResult<u64>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let (fetcher, _clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = (0..10).map(|_| {
            fetcher.fetch(counting_op(&calls, Duration::from_millis(50), Ok(42)))
        });
        let results = futures::future::join_all(futures).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r == &Ok(42)));
        assert!(!fetcher.is_in_flight());
    }

    #[tokio::test]
    async fn test_cached_within_ttl() {
        let (fetcher, clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(1)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59));
        let second = fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(2)))
            .await
            .unwrap();

        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(1));
        let third = fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(3)))
            .await
            .unwrap();
        assert_eq!(third, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let (fetcher, _clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = fetcher
            .fetch(counting_op(
                &calls,
                Duration::ZERO,
                Err(UnlurkError::upstream("HTTP 503")),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, UnlurkError::UpstreamFetchFailed { .. }));
        assert!(fetcher.cached().is_none());

        // Next caller retries immediately
        let ok = fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(7)))
            .await
            .unwrap();
        assert_eq!(ok, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_error() {
        let (fetcher, _clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = (0..5).map(|_| {
            fetcher.fetch(counting_op(
                &calls,
                Duration::from_millis(20),
                Err(UnlurkError::parse("bad age")),
            ))
        });
        let results = futures::future::join_all(futures).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results
            .iter()
            .all(|r| r == &Err(UnlurkError::parse("bad age"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_all_waiters() {
        let (fetcher, _clock) = create_fetcher();
        let fetcher = fetcher.with_deadline(Duration::from_millis(100));
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = (0..3).map(|_| {
            fetcher.fetch(counting_op(&calls, Duration::from_secs(10), Ok(1)))
        });
        let results = futures::future::join_all(futures).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(
                result,
                Err(UnlurkError::Cancelled {
                    after: Duration::from_millis(100)
                })
            );
        }
        assert!(fetcher.cached().is_none());
        assert!(!fetcher.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_fetch_is_not_joined_later() {
        let (fetcher, clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));
        let stale = 1_700_000_000;
        let fresh = stale + 3600;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            fetcher.fetch(counting_op(&calls, Duration::from_millis(50), Ok(stale))),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!fetcher.is_in_flight());

        clock.advance(Duration::from_secs(3600));
        let result = fetcher
            .fetch(counting_op(&calls, Duration::from_millis(50), Ok(fresh)))
            .await
            .unwrap();

        assert_eq!(result, fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.cached().map(|(v, _)| v), Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_survives_one_waiter_leaving() {
        let (fetcher, _clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let leaver = tokio::time::timeout(
            Duration::from_millis(10),
            fetcher.fetch(counting_op(&calls, Duration::from_millis(50), Ok(5))),
        );
        let stayer = fetcher.fetch(counting_op(&calls, Duration::from_millis(50), Ok(6)));
        let (left, stayed) = tokio::join!(leaver, stayer);

        assert!(left.is_err());
        assert_eq!(stayed, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!fetcher.is_in_flight());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (fetcher, _clock) = create_fetcher();
        let calls = Arc::new(AtomicUsize::new(0));

        fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(1)))
            .await
            .unwrap();
        fetcher.invalidate();
        fetcher
            .fetch(counting_op(&calls, Duration::ZERO, Ok(2)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.cached().map(|(v, _)| v), Some(2));
    }
}

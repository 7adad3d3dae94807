//! Remote clock synchronisation.
//!
//! A [`RemoteClock`] polls a [`TimeQuery`] with jittered exponential
//! backoff and keeps the offset between remote and local time. Every wait is
//! raced against a [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ClockSource, SystemClock};
use crate::core::ClockError;

/// One attempt at reading a remote Unix timestamp in seconds.
#[async_trait]
pub trait TimeQuery: Send + Sync {
    /// Fetch the remote time.
    async fn fetch(&self) -> Result<u64, ClockError>;
}

/// Retry schedule for remote time queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry, and the polling interval.
    pub interval: Duration,
    /// Multiplier applied to the delay after each failure.
    pub backoff_factor: f64,
    /// Relative jitter, as a fraction of the current delay.
    pub jitter: f64,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Per-attempt timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            backoff_factor: 2.0,
            jitter: 0.2,
            max_backoff: Duration::from_secs(60),
            max_retries: 4,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Next delay given the current one and a jitter sample in `[-1, 1]`.
    pub fn next_delay(&self, delay: Duration, sample: f64) -> Duration {
        let current = delay.as_secs_f64();
        let next = current * self.backoff_factor + self.jitter * current * sample;
        let max = self.max_backoff.as_secs_f64();

        if !next.is_finite() || next >= max {
            self.max_backoff
        } else {
            Duration::from_secs_f64(next.max(0.0))
        }
    }
}

/// Cloneable cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the token is cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock tracking a remote time source.
pub struct RemoteClock<Q> {
    query: Q,
    policy: RetryPolicy,
    offset: RwLock<Option<i64>>,
    token: CancellationToken,
}

impl<Q: TimeQuery> RemoteClock<Q> {
    /// Create a clock with the default retry policy.
    pub fn new(query: Q) -> Self {
        Self::with_policy(query, RetryPolicy::default())
    }

    /// Create a clock with a custom retry policy.
    pub fn with_policy(query: Q, policy: RetryPolicy) -> Self {
        Self {
            query,
            policy,
            offset: RwLock::new(None),
            token: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Cancellation token shared with in-flight queries.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel in-flight and future queries.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Remote minus local time, once synchronised.
    pub fn offset(&self) -> Option<i64> {
        *self.offset.read()
    }

    /// Query the remote time, retrying with backoff.
    ///
    /// # Errors
    /// Returns `Cancelled` as soon as the token fires, or the last attempt's
    /// error once retries are exhausted.
    pub async fn query(&self) -> Result<u64, ClockError> {
        let mut attempt = 0u32;
        let mut delay = self.policy.interval;

        loop {
            if self.token.is_cancelled() {
                return Err(ClockError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(ClockError::Cancelled),
                result = self.attempt() => result,
            };

            let err = match result {
                Ok(_) if self.token.is_cancelled() => return Err(ClockError::Cancelled),
                Ok(timestamp) => return Ok(timestamp),
                Err(err) => err,
            };

            if attempt >= self.policy.max_retries {
                return Err(err);
            }

            let sample: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
            let next = self.policy.next_delay(delay, sample);
            debug!(
                attempt,
                delay_ms = next.as_millis() as u64,
                error = %err,
                "remote time query failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(ClockError::Cancelled),
                _ = tokio::time::sleep(next) => {}
            }

            delay = next;
            attempt += 1;
        }
    }

    /// Query the remote time and store the offset to local time.
    pub async fn synchronize(&self) -> Result<i64, ClockError> {
        let remote = self.query().await?;
        let local = SystemClock::unix_seconds()?;
        let offset = i64::try_from(remote)
            .map_err(|_| ClockError::InvalidTimestamp(remote.to_string()))?
            - i64::try_from(local).map_err(|_| ClockError::InvalidTimestamp(local.to_string()))?;

        *self.offset.write() = Some(offset);
        debug!(offset, "remote clock synchronised");
        Ok(offset)
    }

    async fn attempt(&self) -> Result<u64, ClockError> {
        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, self.query.fetch())
                .await
                .map_err(|_| ClockError::Timeout)?,
            None => self.query.fetch().await,
        }
    }
}

impl<Q: TimeQuery + 'static> RemoteClock<Q> {
    /// Resynchronise every `interval` until cancelled.
    ///
    /// A zero interval synchronises once.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            if interval.is_zero() {
                if let Err(err) = self.synchronize().await {
                    warn!(error = %err, "remote clock synchronisation failed");
                }
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match self.synchronize().await {
                    Ok(_) => {}
                    Err(ClockError::Cancelled) => break,
                    Err(err) => warn!(error = %err, "remote clock synchronisation failed"),
                }
            }
        })
    }
}

#[async_trait]
impl<Q: TimeQuery> ClockSource for RemoteClock<Q> {
    async fn now(&self) -> Result<u64, ClockError> {
        let offset = self.offset().ok_or(ClockError::NotSynchronized)?;
        let local = SystemClock::unix_seconds()?;
        local
            .checked_add_signed(offset)
            .ok_or_else(|| ClockError::InvalidTimestamp(format!("{local}{offset:+}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct FlakyQuery {
        failures: AtomicU32,
        calls: AtomicU32,
        answer: u64,
    }

    impl FlakyQuery {
        fn new(failures: u32, answer: u64) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                answer,
            }
        }
    }

    #[async_trait]
    impl TimeQuery for FlakyQuery {
        async fn fetch(&self) -> Result<u64, ClockError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(ClockError::QueryFailed("status 503".into()));
            }
            Ok(self.answer)
        }
    }

    struct SlowQuery;

    #[async_trait]
    impl TimeQuery for SlowQuery {
        async fn fetch(&self) -> Result<u64, ClockError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(0)
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
        assert_eq!(policy.max_retries, 4);
        assert!(policy.timeout.is_none());
    }

    #[test]
    fn test_next_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.next_delay(Duration::from_secs(2), 0.0),
            Duration::from_secs(4)
        );
        // +20% of the current delay at the top of the jitter range.
        assert_eq!(
            policy.next_delay(Duration::from_secs(5), 1.0),
            Duration::from_secs(11)
        );
        assert_eq!(
            policy.next_delay(Duration::from_secs(40), 0.0),
            Duration::from_secs(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_retries_then_succeeds() {
        let clock = RemoteClock::new(FlakyQuery::new(2, 1_700_000_000));

        assert_eq!(clock.query().await.unwrap(), 1_700_000_000);
        assert_eq!(clock.query.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_gives_up_after_max_retries() {
        let clock = RemoteClock::new(FlakyQuery::new(u32::MAX, 0));

        let err = clock.query().await.unwrap_err();
        assert!(matches!(err, ClockError::QueryFailed(_)));
        assert_eq!(clock.query.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_backoff_wait() {
        let clock = RemoteClock::new(FlakyQuery::new(u32::MAX, 0));
        let started = tokio::time::Instant::now();

        let (result, _) = tokio::join!(clock.query(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            clock.cancel();
        });

        assert_eq!(result.unwrap_err(), ClockError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(clock.query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_refuses_query() {
        let token = CancellationToken::new();
        let clock = RemoteClock::new(FlakyQuery::new(0, 1)).with_token(token.clone());
        token.cancel();

        assert!(clock.token().is_cancelled());
        assert_eq!(clock.query().await.unwrap_err(), ClockError::Cancelled);
        assert_eq!(clock.query.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let policy = RetryPolicy {
            timeout: Some(Duration::from_secs(1)),
            max_retries: 0,
            ..Default::default()
        };
        let clock = RemoteClock::with_policy(SlowQuery, policy);
        assert_eq!(clock.query().await.unwrap_err(), ClockError::Timeout);
    }

    #[tokio::test]
    async fn test_now_requires_sync() {
        let local = SystemClock::unix_seconds().unwrap();
        let clock = RemoteClock::new(FlakyQuery::new(0, local + 100));

        assert_eq!(clock.now().await.unwrap_err(), ClockError::NotSynchronized);

        let offset = clock.synchronize().await.unwrap();
        assert!((99..=100).contains(&offset));

        let now = clock.now().await.unwrap();
        assert!(now >= local + 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_polls_until_cancelled() {
        let clock = Arc::new(RemoteClock::new(FlakyQuery::new(0, 1_700_000_000)));
        let handle = Arc::clone(&clock).spawn(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(clock.offset().is_some());
        assert!(clock.query.calls.load(Ordering::SeqCst) >= 2);

        clock.cancel();
        handle.await.unwrap();
    }
}

//! Timestamp sources.
//!
//! The envelope reads the current Unix time in seconds from a
//! [`ClockSource`]. When the source fails the envelope logs a warning and
//! falls back to [`SystemClock`].

#[cfg(feature = "clock-sync")]
mod remote;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::core::ClockError;

#[cfg(feature = "clock-sync")]
#[cfg_attr(docsrs, doc(cfg(feature = "clock-sync")))]
pub use remote::{CancellationToken, RemoteClock, RetryPolicy, TimeQuery};

/// Source of the current Unix time in seconds.
#[async_trait]
pub trait ClockSource: Send + Sync {
    /// Current Unix time in seconds.
    async fn now(&self) -> Result<u64, ClockError>;
}

/// Local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Read the system clock synchronously.
    pub fn unix_seconds() -> Result<u64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|_| ClockError::BeforeEpoch)
    }
}

#[async_trait]
impl ClockSource for SystemClock {
    async fn now(&self) -> Result<u64, ClockError> {
        Self::unix_seconds()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClockSource for ManualClock {
    async fn now(&self) -> Result<u64, ClockError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}

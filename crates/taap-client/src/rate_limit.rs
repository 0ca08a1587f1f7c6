//! Sliding-window admission control.
//!
//! The limiter records the instant of every admitted request and, on each
//! check, forgets the ones that have aged out of the window. A request is
//! admitted while fewer than `max_requests` remain. No credit is banked when
//! a window passes quietly.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{ConfigError, Result};

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The tokio clock. Honors paused time in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock for deterministic tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct MockClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Create a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Sliding-window rate limiter, safe to share between tasks.
///
/// Prune-and-append happens under one lock, so concurrent callers never
/// admit more than `max_requests` per window between them.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`.
    ///
    /// A `max_requests` of zero is accepted and never admits anything.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `window` is zero.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    /// Create a limiter reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `window` is zero.
    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if window.is_zero() {
            return Err(ConfigError::invalid(
                "rate_limiter.window",
                "window must be positive",
            ));
        }

        Ok(Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
            clock,
        })
    }

    /// Admit a request if the window has room, recording it on success.
    ///
    /// Timestamps at least `window` old are discarded first. Nothing is
    /// recorded when the request is refused.
    pub fn can_proceed(&self) -> bool {
        let mut timestamps = self.timestamps.lock();
        let now = self.clock.now();

        while timestamps
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            timestamps.pop_front();
        }

        if timestamps.len() < self.max_requests as usize {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// How long until the oldest recorded request leaves the window.
    ///
    /// Zero when nothing is recorded. Advisory only; does not prune.
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        let timestamps = self.timestamps.lock();
        timestamps.front().map_or(Duration::ZERO, |&oldest| {
            let age = self.clock.now().saturating_duration_since(oldest);
            self.window.saturating_sub(age)
        })
    }

    /// Maximum requests admitted per window.
    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Length of the sliding window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Number of recorded timestamps, as of the last prune.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.lock().len()
    }

    /// Whether no timestamps are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.lock().is_empty()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("recorded", &self.len())
            .finish_non_exhaustive()
    }
}

//! Sliding-window request limiter, one per provider client instance.
//!
//! Keeps the timestamps of recorded requests and counts those younger than
//! the window. At any instant the number of timestamps inside the trailing
//! window never exceeds `capacity`.
//!
//! Clients are shared across tokio worker threads through the
//! [`ClientRegistry`](crate::registry::ClientRegistry), so the check and the
//! record happen under one mutex in [`RateLimiter::try_acquire`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A limiter allowing `capacity` requests per 60 seconds.
    pub fn new(capacity: usize) -> Self {
        Self::with_window(capacity, DEFAULT_WINDOW)
    }

    pub fn with_window(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True iff fewer than `capacity` requests fall inside the window.
    pub fn check_rate_limit(&self) -> bool {
        self.check_rate_limit_at(Instant::now())
    }

    pub fn check_rate_limit_at(&self, now: Instant) -> bool {
        self.in_window_at(now) < self.capacity
    }

    /// Record a request at the current time and prune expired timestamps.
    pub fn record_request(&self) {
        self.record_request_at(Instant::now())
    }

    pub fn record_request_at(&self, now: Instant) {
        let mut timestamps = self.lock();
        prune(&mut timestamps, now, self.window);
        timestamps.push_back(now);
    }

    /// Check and record as one step. Returns `false` without recording when
    /// the window is full.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut timestamps = self.lock();
        prune(&mut timestamps, now, self.window);
        if timestamps.len() >= self.capacity {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Number of recorded requests inside the window.
    pub fn in_window(&self) -> usize {
        self.in_window_at(Instant::now())
    }

    pub fn in_window_at(&self, now: Instant) -> usize {
        self.lock()
            .iter()
            .filter(|&&ts| now.saturating_duration_since(ts) < self.window)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The deque is always left consistent, so a poisoned lock is still usable.
        self.timestamps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

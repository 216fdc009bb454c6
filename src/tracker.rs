//! Failed login attempt tracking with time-windowed lockout.
//!
//! This module implements account-based brute force protection: per-key
//! failed attempt counting with automatic lockout once a configurable
//! threshold is reached, and automatic unlock once the lock window elapses.
//!
//! # Features
//!
//! - Per-key attempt tracking in a sharded concurrent map
//! - Automatic lockout after configurable failed attempts
//! - Lazy, read-triggered expiry of stale records (no sweeper required)
//! - Optional background sweep task for memory bounding
//!
//! # Example
//!
//! ```rust
//! use portcullis::{AttemptTracker, LockoutConfig};
//!
//! let tracker = AttemptTracker::new(LockoutConfig::default());
//!
//! for _ in 0..5 {
//!     tracker.record_failure("alice");
//! }
//! assert!(tracker.is_blocked("alice"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::LockoutConfig;

/// Per-key mutable state: how many failures, and when the last one happened.
///
/// Both fields are atomics so a failure can be recorded through a shared
/// map reference without taking a per-record lock.
#[derive(Debug, Default)]
struct AttemptRecord {
    failures: AtomicU32,
    last_failure_at_ms: AtomicI64,
}

/// Snapshot of a key's lockout state, as observed at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockoutStatus {
    pub failed_attempts: u32,
    pub is_locked: bool,
    /// Seconds until the lock window elapses; `Some` only while locked.
    pub retry_after_seconds: Option<u64>,
}

/// In-memory tracker of failed login attempts per identity key.
///
/// Keys are opaque strings; any case-normalization policy is the caller's
/// responsibility and must be applied consistently before calling in.
///
/// # Thread Safety
///
/// The tracker is safe to share across tasks and threads. The record map is
/// key-sharded, so operations on unrelated keys never contend, and the
/// per-key counter uses an atomic increment, so concurrent failures on the
/// same key are never lost.
///
/// # State lifetime
///
/// Lockout state lives in process memory only: it does not survive a restart
/// and is not shared between service instances. A record is removed (never
/// merely zeroed) on success or on observed expiry, so removal and
/// re-creation always start a fresh window.
pub struct AttemptTracker {
    records: DashMap<String, AttemptRecord>,
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
}

impl AttemptTracker {
    /// Create a tracker reading the system wall clock.
    pub fn new(config: LockoutConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with an injected time source.
    pub fn with_clock(config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            config,
            clock,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Check if lockout tracking is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Record a failed login attempt for `key`.
    ///
    /// Creates the record on first failure, otherwise increments the counter
    /// by exactly one and refreshes the last-failure timestamp. A failure
    /// that lands just after a reader expired the record simply starts a
    /// fresh one (last writer wins).
    pub fn record_failure(&self, key: &str) {
        if !self.config.enabled {
            return;
        }

        let now_ms = self.clock.now().timestamp_millis();
        let failures = {
            let record = self.records.entry(key.to_owned()).or_default();
            let failures = record.failures.fetch_add(1, Ordering::SeqCst) + 1;
            record.last_failure_at_ms.store(now_ms, Ordering::SeqCst);
            failures
        };

        if failures == self.config.max_attempts {
            tracing::warn!(key, failures, "Key locked out after repeated login failures");
        } else {
            tracing::debug!(key, failures, "Recorded failed login attempt");
        }
    }

    /// Clear all attempt state for `key` after a successful login.
    ///
    /// Removing an absent key is a no-op. A success racing a failure on the
    /// same key may leave either the cleared or the incremented state; this
    /// is a known, benign race for a best-effort guard.
    pub fn record_success(&self, key: &str) {
        if self.records.remove(key).is_some() {
            tracing::debug!(key, "Cleared failed login attempts");
        }
    }

    /// Check whether `key` is currently locked out.
    ///
    /// A key with no record is never blocked. A record whose lock window has
    /// elapsed is removed here (lazy expiry) and reported as not blocked;
    /// the removal re-checks the timestamp under the shard write lock so a
    /// concurrent failure that just refreshed the record is not discarded.
    pub fn is_blocked(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let now = self.clock.now();
        let (failures, last_ms) = match self.records.get(key) {
            Some(record) => (
                record.failures.load(Ordering::SeqCst),
                record.last_failure_at_ms.load(Ordering::SeqCst),
            ),
            None => return false,
        };

        if self.window_elapsed(now, last_ms) {
            self.records.remove_if(key, |_, record| {
                self.window_elapsed(now, record.last_failure_at_ms.load(Ordering::SeqCst))
            });
            return false;
        }

        failures >= self.config.max_attempts
    }

    /// Seconds left in the lock window for `key`, in whole seconds (floor).
    ///
    /// Returns 0 for an absent key or one whose window has elapsed. Unlike
    /// [`is_blocked`](Self::is_blocked), this is a pure read: an expired
    /// record is left for the next blocked-check or sweep to reap.
    pub fn remaining_lock_seconds(&self, key: &str) -> u64 {
        if !self.config.enabled {
            return 0;
        }

        let last_ms = match self.records.get(key) {
            Some(record) => record.last_failure_at_ms.load(Ordering::SeqCst),
            None => return 0,
        };

        // A negative elapsed time means the clock stepped backwards; treat
        // the window as freshly started rather than expired.
        let elapsed_ms = self
            .clock
            .now()
            .timestamp_millis()
            .saturating_sub(last_ms)
            .max(0);
        let remaining_ms = self.window_millis().saturating_sub(elapsed_ms);
        (remaining_ms / 1000) as u64
    }

    /// Observe the full lockout state for `key`.
    ///
    /// Like [`is_blocked`](Self::is_blocked), this lazily expires a record
    /// whose window has elapsed.
    pub fn status(&self, key: &str) -> LockoutStatus {
        let is_locked = self.is_blocked(key);
        let failed_attempts = self
            .records
            .get(key)
            .map(|record| record.failures.load(Ordering::SeqCst))
            .unwrap_or(0);
        let retry_after_seconds = is_locked.then(|| self.remaining_lock_seconds(key));

        LockoutStatus {
            failed_attempts,
            is_locked,
            retry_after_seconds,
        }
    }

    /// Remove every record whose lock window has elapsed.
    ///
    /// Returns the number of records removed. Stale records only cost
    /// memory, never incorrect blocking, so running this is optional.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| {
            !self.window_elapsed(now, record.last_failure_at_ms.load(Ordering::SeqCst))
        });
        before.saturating_sub(self.records.len())
    }

    /// Start a background task that periodically sweeps expired records.
    ///
    /// The task runs until `shutdown` observes a change. Correctness never
    /// depends on the sweep running; it only bounds memory growth from keys
    /// that are never read again.
    pub fn start_sweep_task(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = tracker.sweep_expired();
                        if removed > 0 {
                            tracing::info!(removed, "Swept expired lockout records");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down lockout sweep task");
                        break;
                    }
                }
            }
        })
    }

    fn window_millis(&self) -> i64 {
        i64::try_from(self.config.lock_window.as_millis()).unwrap_or(i64::MAX)
    }

    fn window_elapsed(&self, now: DateTime<Utc>, last_ms: i64) -> bool {
        now.timestamp_millis().saturating_sub(last_ms) > self.window_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration as ChronoDuration;

    fn tracker_with_clock(config: LockoutConfig) -> (AttemptTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let tracker = AttemptTracker::with_clock(config, clock.clone());
        (tracker, clock)
    }

    #[test]
    fn unknown_key_is_never_blocked() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        assert!(!tracker.is_blocked("nobody"));
        assert_eq!(tracker.remaining_lock_seconds("nobody"), 0);
        let status = tracker.status("nobody");
        assert_eq!(status.failed_attempts, 0);
        assert!(!status.is_locked);
        assert_eq!(status.retry_after_seconds, None);
    }

    #[test]
    fn below_threshold_is_not_blocked() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..4 {
            tracker.record_failure("alice");
        }

        assert!(!tracker.is_blocked("alice"));
        assert_eq!(tracker.status("alice").failed_attempts, 4);
    }

    #[test]
    fn threshold_failure_blocks() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }

        assert!(tracker.is_blocked("alice"));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 60);
        let status = tracker.status("alice");
        assert!(status.is_locked);
        assert_eq!(status.failed_attempts, 5);
        assert_eq!(status.retry_after_seconds, Some(60));
    }

    #[test]
    fn success_resets_counting() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..4 {
            tracker.record_failure("bob");
        }
        tracker.record_success("bob");

        assert!(!tracker.is_blocked("bob"));
        assert_eq!(tracker.status("bob").failed_attempts, 0);

        // Counting starts over from 1, not 5.
        tracker.record_failure("bob");
        assert_eq!(tracker.status("bob").failed_attempts, 1);
        assert!(!tracker.is_blocked("bob"));
    }

    #[test]
    fn success_on_absent_key_is_noop() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        tracker.record_success("ghost");
        tracker.record_success("ghost");
        assert!(!tracker.is_blocked("ghost"));
    }

    #[test]
    fn lock_expires_lazily_after_window() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        assert!(tracker.is_blocked("alice"));

        clock.advance(ChronoDuration::seconds(61));

        // No explicit reset: the read observes expiry and removes the record.
        assert!(!tracker.is_blocked("alice"));
        assert_eq!(tracker.status("alice").failed_attempts, 0);

        // A failure after expiry starts a fresh window.
        tracker.record_failure("alice");
        let status = tracker.status("alice");
        assert_eq!(status.failed_attempts, 1);
        assert!(!status.is_locked);
    }

    #[test]
    fn still_blocked_at_exact_window_boundary() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }

        clock.advance(ChronoDuration::seconds(60));
        assert!(tracker.is_blocked("alice"));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 0);

        clock.advance(ChronoDuration::milliseconds(1));
        assert!(!tracker.is_blocked("alice"));
    }

    #[test]
    fn remaining_lock_seconds_counts_down() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        assert_eq!(tracker.remaining_lock_seconds("alice"), 60);

        clock.advance(ChronoDuration::seconds(10));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 50);

        clock.advance(ChronoDuration::seconds(20));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 30);

        clock.advance(ChronoDuration::seconds(31));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 0);
    }

    #[test]
    fn new_failure_restarts_the_window() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        clock.advance(ChronoDuration::seconds(30));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 30);

        tracker.record_failure("alice");
        assert_eq!(tracker.remaining_lock_seconds("alice"), 60);
        assert_eq!(tracker.status("alice").failed_attempts, 6);
    }

    #[test]
    fn remaining_is_whole_seconds_floor() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        tracker.record_failure("alice");
        clock.advance(ChronoDuration::milliseconds(1500));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 58);
    }

    #[test]
    fn clock_regression_does_not_expire_the_lock() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        let locked_at = clock.now();
        clock.set(locked_at - ChronoDuration::seconds(30));

        assert!(tracker.is_blocked("alice"));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 60);
    }

    #[test]
    fn keys_are_tracked_independently() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());

        for _ in 0..5 {
            tracker.record_failure("alice");
        }

        assert!(tracker.is_blocked("alice"));
        assert!(!tracker.is_blocked("bob"));
        assert_eq!(tracker.status("bob").failed_attempts, 0);
    }

    #[test]
    fn disabled_config_never_records_or_blocks() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::disabled());

        for _ in 0..20 {
            tracker.record_failure("alice");
        }

        assert!(!tracker.is_blocked("alice"));
        assert_eq!(tracker.remaining_lock_seconds("alice"), 0);
        assert_eq!(tracker.status("alice").failed_attempts, 0);
    }

    #[test]
    fn concurrent_failures_are_not_lost() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());
        let threads: u32 = 8;
        let per_thread: u32 = 25;

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..per_thread {
                        tracker.record_failure("alice");
                    }
                });
            }
        });

        assert_eq!(tracker.status("alice").failed_attempts, threads * per_thread);
        assert!(tracker.is_blocked("alice"));
    }

    #[test]
    fn sweep_removes_only_expired_records() {
        let (tracker, clock) = tracker_with_clock(LockoutConfig::default());

        tracker.record_failure("stale");
        clock.advance(ChronoDuration::seconds(61));
        tracker.record_failure("fresh");

        assert_eq!(tracker.sweep_expired(), 1);
        assert_eq!(tracker.status("fresh").failed_attempts, 1);
        assert_eq!(tracker.status("stale").failed_attempts, 0);
    }

    #[test]
    fn sweep_on_empty_tracker_removes_nothing() {
        let (tracker, _clock) = tracker_with_clock(LockoutConfig::default());
        assert_eq!(tracker.sweep_expired(), 0);
    }

    #[tokio::test]
    async fn sweep_task_stops_on_shutdown() {
        let tracker = Arc::new(AttemptTracker::new(LockoutConfig::default()));
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let handle = tracker.start_sweep_task(Duration::from_secs(3600), shutdown_rx);
        shutdown_tx.send(true).unwrap();

        handle.await.unwrap();
    }
}

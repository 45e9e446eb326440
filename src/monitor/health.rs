// src/monitor/health.rs

use crate::common::hal_traits::OpcInstant;
use core::time::Duration;

/// Consecutive failed decodes at which the quality flag drops.
pub const BAD_STREAK_LIMIT: u32 = 5;

/// Coarse health of a sensor, derived from its [`HealthState`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HealthStatus {
    /// No decode attempted since initialization.
    Unknown,
    /// Last attempt succeeded.
    Good,
    /// Between one and four consecutive failures; data still counts as good.
    Degraded,
    /// At least [`BAD_STREAK_LIMIT`] consecutive failures.
    Failed,
}

/// Per-sensor success and failure bookkeeping.
///
/// Two independent signals live here: the bad streak, which drives the
/// quality flag, and the age of the last good reading, which decides when a
/// power-cycle recovery is due.
#[derive(Debug, Clone)]
pub struct HealthState<I> {
    good_count: u32,
    bad_streak: u32,
    last_good: I,
    reset_threshold: Duration,
    quality: bool,
    attempted: bool,
}

impl<I: OpcInstant> HealthState<I> {
    pub fn new(now: I, reset_threshold: Duration) -> Self {
        HealthState {
            good_count: 1,
            bad_streak: 0,
            last_good: now,
            reset_threshold,
            quality: true,
            attempted: false,
        }
    }

    /// Returns `true` if this success restored a dropped quality flag.
    pub fn record_success(&mut self, now: I) -> bool {
        let restored = !self.quality;
        self.attempted = true;
        self.good_count = self.good_count.saturating_add(1);
        self.bad_streak = 0;
        self.advance_last_good(now);
        self.quality = true;
        restored
    }

    /// Returns `true` if this failure dropped the quality flag.
    pub fn record_failure(&mut self) -> bool {
        self.attempted = true;
        self.bad_streak = self.bad_streak.saturating_add(1);
        let was_good = self.quality;
        if self.bad_streak >= BAD_STREAK_LIMIT {
            self.quality = false;
        }
        was_good && !self.quality
    }

    /// Whether the last good reading is at least `reset_threshold` old.
    pub fn recovery_due(&self, now: I) -> bool {
        self.since_last_good(now) >= self.reset_threshold
    }

    /// Restarts the age timer after a recovery attempt, whatever its outcome.
    pub fn rearm(&mut self, now: I) {
        self.advance_last_good(now);
    }

    fn advance_last_good(&mut self, now: I) {
        if now > self.last_good {
            self.last_good = now;
        }
    }

    pub fn since_last_good(&self, now: I) -> Duration {
        if now > self.last_good {
            now - self.last_good
        } else {
            Duration::ZERO
        }
    }

    pub fn status(&self) -> HealthStatus {
        if !self.attempted {
            HealthStatus::Unknown
        } else if self.bad_streak == 0 {
            HealthStatus::Good
        } else if self.bad_streak < BAD_STREAK_LIMIT {
            HealthStatus::Degraded
        } else {
            HealthStatus::Failed
        }
    }

    pub fn good_count(&self) -> u32 {
        self.good_count
    }

    pub fn bad_streak(&self) -> u32 {
        self.bad_streak
    }

    /// `false` exactly while the bad streak is at or above [`BAD_STREAK_LIMIT`].
    pub fn log_quality(&self) -> bool {
        self.quality
    }

    pub fn last_good(&self) -> I {
        self.last_good
    }

    pub fn reset_threshold(&self) -> Duration {
        self.reset_threshold
    }

    pub fn set_reset_threshold(&mut self, threshold: Duration) {
        self.reset_threshold = threshold;
    }
}

//! Proof-of-attention integrity tracking.
//!
//! Tracks foreground/background transitions as a toggle with timestamps.
//! The session state machine forwards lifecycle signals here and asks
//! `check_integrity` on every tick and once more at completion time, so
//! a session can fail mid-flight even if it would have passed a coarser
//! end-of-session check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Foreground/background interval tracker for one focus session.
///
/// Duplicate signals are idempotent: `mark_background` only takes effect
/// while foreground, `mark_foreground` only while backgrounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttentionValidator {
    /// Start of the currently-open background interval, if any.
    background_since: Option<DateTime<Utc>>,
    /// Total length of all closed background intervals.
    closed_out_of_focus_ms: u64,
    exit_timestamps: Vec<DateTime<Utc>>,
    return_timestamps: Vec<DateTime<Utc>>,
}

impl AttentionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an app-backgrounded signal. Returns `false` if the signal
    /// was a duplicate (already backgrounded).
    pub fn mark_background(&mut self, now: DateTime<Utc>) -> bool {
        if self.background_since.is_some() {
            return false;
        }
        self.background_since = Some(now);
        self.exit_timestamps.push(now);
        true
    }

    /// Record an app-foregrounded signal, closing the open interval.
    /// Returns `false` if the signal was a duplicate (already foreground).
    pub fn mark_foreground(&mut self, now: DateTime<Utc>) -> bool {
        match self.background_since.take() {
            Some(since) => {
                let elapsed = (now - since).num_milliseconds().max(0) as u64;
                self.closed_out_of_focus_ms += elapsed;
                self.return_timestamps.push(now);
                true
            }
            None => false,
        }
    }

    /// Length of the currently-open background interval, zero if foreground.
    pub fn open_interval_ms(&self, now: DateTime<Utc>) -> u64 {
        self.background_since
            .map(|since| (now - since).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Cumulative out-of-focus time: closed intervals plus any open one.
    pub fn out_of_focus_ms(&self, now: DateTime<Utc>) -> u64 {
        self.closed_out_of_focus_ms + self.open_interval_ms(now)
    }

    /// Whether the app was backgrounded at least once.
    pub fn was_backgrounded(&self) -> bool {
        !self.exit_timestamps.is_empty()
    }

    pub fn is_backgrounded(&self) -> bool {
        self.background_since.is_some()
    }

    /// Integrity holds while the cumulative out-of-focus time (including
    /// a currently-open interval) stays within the threshold.
    pub fn check_integrity(&self, threshold_ms: u64, now: DateTime<Utc>) -> bool {
        self.out_of_focus_ms(now) <= threshold_ms
    }

    pub fn exit_timestamps(&self) -> &[DateTime<Utc>] {
        &self.exit_timestamps
    }

    pub fn return_timestamps(&self) -> &[DateTime<Utc>] {
        &self.return_timestamps
    }

    /// Clear all interval state. Invoked when a new session starts so
    /// nothing carries over between sessions.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const THRESHOLD_MS: u64 = 30_000;

    #[test]
    fn duplicate_signals_are_idempotent() {
        let mut v = AttentionValidator::new();
        let t0 = Utc::now();

        assert!(v.mark_background(t0));
        assert!(!v.mark_background(t0 + Duration::seconds(5)));
        assert_eq!(v.exit_timestamps().len(), 1);

        assert!(v.mark_foreground(t0 + Duration::seconds(10)));
        assert!(!v.mark_foreground(t0 + Duration::seconds(11)));
        assert_eq!(v.return_timestamps().len(), 1);
    }

    #[test]
    fn closed_intervals_accumulate() {
        let mut v = AttentionValidator::new();
        let t0 = Utc::now();

        v.mark_background(t0);
        v.mark_foreground(t0 + Duration::seconds(8));
        v.mark_background(t0 + Duration::seconds(20));
        v.mark_foreground(t0 + Duration::seconds(27));

        assert_eq!(v.out_of_focus_ms(t0 + Duration::seconds(30)), 15_000);
        assert!(v.check_integrity(THRESHOLD_MS, t0 + Duration::seconds(30)));
    }

    #[test]
    fn open_interval_counts_toward_integrity() {
        let mut v = AttentionValidator::new();
        let t0 = Utc::now();

        v.mark_background(t0);
        // 45 continuous seconds backgrounded, never returned.
        let now = t0 + Duration::seconds(45);
        assert_eq!(v.out_of_focus_ms(now), 45_000);
        assert!(!v.check_integrity(THRESHOLD_MS, now));
    }

    #[test]
    fn ten_seconds_total_is_under_threshold() {
        let mut v = AttentionValidator::new();
        let t0 = Utc::now();

        v.mark_background(t0);
        v.mark_foreground(t0 + Duration::seconds(10));

        assert!(v.check_integrity(THRESHOLD_MS, t0 + Duration::minutes(20)));
        assert!(v.was_backgrounded());
    }

    #[test]
    fn reset_clears_everything() {
        let mut v = AttentionValidator::new();
        let t0 = Utc::now();

        v.mark_background(t0);
        v.mark_foreground(t0 + Duration::seconds(50));
        assert!(!v.check_integrity(THRESHOLD_MS, t0 + Duration::seconds(50)));

        v.reset();
        assert!(v.check_integrity(THRESHOLD_MS, t0 + Duration::seconds(60)));
        assert!(!v.was_backgrounded());
        assert!(!v.is_backgrounded());
    }
}

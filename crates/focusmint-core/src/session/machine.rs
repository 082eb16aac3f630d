//! Focus session state machine.
//!
//! A wall-clock-based state machine: it holds no internal thread and the
//! owning runner is responsible for calling `tick()` once per second
//! while the session is active.
//!
//! ## State transitions
//!
//! ```text
//! Pending -> Active <-> Paused -> (Completed | Failed)
//! {Pending, Active, Paused} -> Cancelled
//! ```
//!
//! Completed, Failed and Cancelled are terminal. Every terminal
//! transition yields exactly one [`GrantRequest`] (amount may be zero),
//! keyed by the session id so a retried grant replays idempotently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::validator::AttentionValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

/// Tunables for session evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum tolerated out-of-focus time before the session is
    /// forcibly failed.
    pub integrity_threshold_ms: u64,
    /// Flat bonus granted on top of per-minute earnings when the
    /// countdown runs to completion with integrity intact.
    pub completion_bonus: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            integrity_threshold_ms: 30_000,
            completion_bonus: 5,
        }
    }
}

/// A reward-grant request emitted on terminal transition. The session id
/// doubles as the idempotency key: replaying the same request produces
/// exactly one ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRequest {
    pub session_id: Uuid,
    pub amount: u64,
}

/// Result of a tick that drove the session to a terminal state.
#[derive(Debug, Clone)]
pub struct TerminalOutcome {
    pub status: SessionStatus,
    pub grant: GrantRequest,
}

/// One timed focus attempt.
///
/// Mutated only through its own operations; the runner serializes all
/// mutations through a single owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    id: Uuid,
    duration_ms: u64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    status: SessionStatus,
    /// Remaining countdown time in milliseconds.
    remaining_ms: u64,
    amount_granted: u64,
    /// Timestamp of the last elapsed-time flush while active.
    #[serde(default)]
    last_tick: Option<DateTime<Utc>>,
    attention: AttentionValidator,
    config: SessionConfig,
}

impl FocusSession {
    /// Create a session in the `Pending` state with a chosen duration.
    pub fn new(duration_ms: u64, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            duration_ms,
            start_time: None,
            end_time: None,
            status: SessionStatus::Pending,
            remaining_ms: duration_ms,
            amount_granted: 0,
            last_tick: None,
            attention: AttentionValidator::new(),
            config,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.duration_ms - self.remaining_ms
    }

    pub fn amount_granted(&self) -> u64 {
        self.amount_granted
    }

    /// 0.0 .. 1.0 progress through the planned duration.
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        self.elapsed_ms() as f64 / self.duration_ms as f64
    }

    pub fn out_of_focus_ms(&self, now: DateTime<Utc>) -> u64 {
        self.attention.out_of_focus_ms(now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the countdown. Valid only from `Pending`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Pending {
            return Err(SessionError::NotStartable(self.status));
        }
        self.attention.reset();
        self.start_time = Some(now);
        self.last_tick = Some(now);
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Stop the countdown without resetting elapsed time.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::InvalidTransition {
                operation: "pause",
                from: self.status,
            });
        }
        self.flush_elapsed(now);
        self.last_tick = None;
        self.status = SessionStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Paused {
            return Err(SessionError::InvalidTransition {
                operation: "resume",
                from: self.status,
            });
        }
        self.last_tick = Some(now);
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Abort from any non-terminal state. Amount is forced to zero.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<TerminalOutcome, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyTerminal(self.status));
        }
        self.flush_elapsed(now);
        Ok(self.finish(SessionStatus::Cancelled, 0, now))
    }

    /// Forwarded lifecycle signal. Does not change session status.
    pub fn mark_background(&mut self, now: DateTime<Utc>) -> bool {
        self.attention.mark_background(now)
    }

    /// Forwarded lifecycle signal. Does not change session status.
    pub fn mark_foreground(&mut self, now: DateTime<Utc>) -> bool {
        self.attention.mark_foreground(now)
    }

    /// Advance the countdown. Called once per second while active.
    ///
    /// An integrity failure terminates the session immediately with
    /// amount zero, bypassing the remaining-time check. Otherwise, when
    /// the countdown reaches zero the completion evaluation runs.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TerminalOutcome> {
        if self.status != SessionStatus::Active {
            return None;
        }
        self.flush_elapsed(now);

        if !self
            .attention
            .check_integrity(self.config.integrity_threshold_ms, now)
        {
            return Some(self.finish(SessionStatus::Failed, 0, now));
        }

        if self.remaining_ms == 0 {
            return Some(self.evaluate_completion(now));
        }
        None
    }

    /// Completion evaluation at countdown expiry. Integrity has already
    /// been checked on this tick; a failed check never reaches here.
    fn evaluate_completion(&mut self, now: DateTime<Utc>) -> TerminalOutcome {
        let elapsed_minutes = self.elapsed_ms() / 60_000;
        let amount = elapsed_minutes + self.config.completion_bonus;
        self.finish(SessionStatus::Completed, amount, now)
    }

    fn finish(&mut self, status: SessionStatus, amount: u64, now: DateTime<Utc>) -> TerminalOutcome {
        self.status = status;
        self.end_time = Some(now);
        self.amount_granted = amount;
        self.last_tick = None;
        TerminalOutcome {
            status,
            grant: GrantRequest {
                session_id: self.id,
                amount,
            },
        }
    }

    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_tick {
            let elapsed = (now - last).num_milliseconds().max(0) as u64;
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
            self.last_tick = Some(now);
        }
    }

    /// Summarize into the serialized record shape.
    pub fn to_record(&self, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: self.id,
            duration_ms: self.duration_ms,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            amount_granted: self.amount_granted,
            was_backgrounded: self.attention.was_backgrounded(),
            out_of_focus_ms: self.attention.out_of_focus_ms(self.end_time.unwrap_or(now)),
            exit_timestamps: self.attention.exit_timestamps().to_vec(),
            return_timestamps: self.attention.return_timestamps().to_vec(),
        }
    }
}

/// Serialized summary of a session. Field names round-trip with the
/// persisted camelCase record shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub duration_ms: u64,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub amount_granted: u64,
    pub was_backgrounded: bool,
    pub out_of_focus_ms: u64,
    pub exit_timestamps: Vec<DateTime<Utc>>,
    pub return_timestamps: Vec<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        "2026-03-14T09:00:00Z".parse().unwrap()
    }

    fn minutes(n: i64) -> Duration {
        Duration::minutes(n)
    }

    #[test]
    fn start_only_from_pending() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        assert!(s.start(t0).is_ok());
        assert_eq!(s.status(), SessionStatus::Active);

        let err = s.start(t0).unwrap_err();
        assert_eq!(err, SessionError::NotStartable(SessionStatus::Active));
    }

    #[test]
    fn pause_freezes_elapsed_time() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        s.tick(t0 + minutes(5));
        s.pause(t0 + minutes(5)).unwrap();

        // Time passes while paused; nothing is consumed.
        s.resume(t0 + minutes(15)).unwrap();
        s.tick(t0 + minutes(16));
        assert_eq!(s.elapsed_ms(), 6 * 60_000);
    }

    #[test]
    fn pause_from_pending_is_an_error() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        assert!(matches!(
            s.pause(base()),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(s.status(), SessionStatus::Pending);
    }

    #[test]
    fn clean_completion_earns_minutes_plus_bonus() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();

        let outcome = s.tick(t0 + minutes(25)).expect("should complete");
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.grant.amount, 30); // 25 minutes + 5 bonus
        assert_eq!(outcome.grant.session_id, s.id());
        assert_eq!(s.status(), SessionStatus::Completed);
    }

    #[test]
    fn sustained_background_fails_before_countdown_expires() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        s.mark_background(t0 + Duration::seconds(60));

        // Tick 45 seconds into the background interval, well before the
        // 25-minute countdown is up.
        let outcome = s.tick(t0 + Duration::seconds(105)).expect("should fail");
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.grant.amount, 0);
        assert!(s.remaining_ms() > 0);
    }

    #[test]
    fn brief_background_under_threshold_still_completes() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        s.mark_background(t0 + Duration::seconds(120));
        s.mark_foreground(t0 + Duration::seconds(130));

        let outcome = s.tick(t0 + minutes(25)).expect("should complete");
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.grant.amount, 30);
    }

    #[test]
    fn integrity_checked_once_more_at_completion() {
        let mut s = FocusSession::new(60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        // Backgrounded for 35s in the middle, no tick observes it until
        // the countdown has already expired.
        s.mark_background(t0 + Duration::seconds(10));
        s.mark_foreground(t0 + Duration::seconds(45));

        let outcome = s.tick(t0 + Duration::seconds(70)).expect("terminal");
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.grant.amount, 0);
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let t0 = base();

        let mut pending = FocusSession::new(60_000, SessionConfig::default());
        let outcome = pending.cancel(t0).unwrap();
        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.grant.amount, 0);

        let mut active = FocusSession::new(60_000, SessionConfig::default());
        active.start(t0).unwrap();
        assert!(active.cancel(t0 + minutes(1)).is_ok());

        let mut done = FocusSession::new(60_000, SessionConfig::default());
        done.start(t0).unwrap();
        done.tick(t0 + minutes(1)).unwrap();
        assert!(matches!(
            done.cancel(t0 + minutes(2)),
            Err(SessionError::AlreadyTerminal(SessionStatus::Completed))
        ));
    }

    #[test]
    fn duplicate_lifecycle_signals_are_absorbed() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        assert!(s.mark_background(t0 + Duration::seconds(5)));
        assert!(!s.mark_background(t0 + Duration::seconds(6)));
        assert!(s.mark_foreground(t0 + Duration::seconds(10)));
        assert!(!s.mark_foreground(t0 + Duration::seconds(11)));
        assert_eq!(s.out_of_focus_ms(t0 + Duration::seconds(20)), 5_000);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut s = FocusSession::new(25 * 60_000, SessionConfig::default());
        let t0 = base();
        s.start(t0).unwrap();
        s.mark_background(t0 + Duration::seconds(5));
        s.mark_foreground(t0 + Duration::seconds(12));
        s.tick(t0 + minutes(25)).unwrap();

        let record = s.to_record(t0 + minutes(25));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"durationMs\""));
        assert!(json.contains("\"amountGranted\""));
        assert!(json.contains("\"exitTimestamps\""));

        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.status, SessionStatus::Completed);
        assert_eq!(back.out_of_focus_ms, 7_000);
        assert!(back.was_backgrounded);
        assert_eq!(back.exit_timestamps.len(), 1);
        assert_eq!(back.return_timestamps.len(), 1);
    }

    #[test]
    fn end_time_set_only_on_terminal_states() {
        let mut s = FocusSession::new(60_000, SessionConfig::default());
        let t0 = base();
        assert!(s.to_record(t0).end_time.is_none());
        s.start(t0).unwrap();
        s.pause(t0 + Duration::seconds(10)).unwrap();
        assert!(s.to_record(t0 + Duration::seconds(10)).end_time.is_none());
        s.cancel(t0 + Duration::seconds(20)).unwrap();
        assert!(s.to_record(t0 + Duration::seconds(20)).end_time.is_some());
    }
}

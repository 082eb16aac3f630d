//! Step telemetry anti-cheat validation.
//!
//! Raw step-count deltas arrive at irregular intervals from an external
//! sensor stream. Rules are applied in order; the first failure rejects
//! the delta. Rejection does *not* zero the sample outright: rate and
//! window failures are downgraded to a conservative estimate (half the
//! maximum plausible rate over the elapsed interval) so legitimate but
//! unusually fast activity is capped rather than discarded. Negative
//! deltas and daily-cap violations are rejected outright.
//!
//! The rolling window, same-day counter and last-accepted timestamp are
//! process-lifetime state, derivable from the accepted-event history
//! when durability is needed.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const WINDOW_MS: i64 = 60_000;

/// Plausibility limits for step telemetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepValidatorConfig {
    /// Maximum plausible rate for the burst-injection guard (rule 2).
    pub max_steps_per_minute: u64,
    /// Cap on per-step events inside the rolling one-minute window (rule 3).
    pub window_cap_per_minute: u64,
    /// Maximum same-day cumulative total (rule 4).
    pub max_daily_steps: u64,
}

impl Default for StepValidatorConfig {
    fn default() -> Self {
        Self {
            max_steps_per_minute: 240,
            window_cap_per_minute: 240,
            max_daily_steps: 20_000,
        }
    }
}

/// Why a delta was rejected, if it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepVerdict {
    Accepted,
    /// Delta below zero.
    NegativeDelta,
    /// Implied rate exceeded the per-minute maximum since the last
    /// accepted observation.
    RateExceeded,
    /// The rolling one-minute window would exceed its cap.
    WindowExceeded,
    /// The same-day cumulative total would exceed the daily cap.
    DailyCapExceeded,
}

/// Outcome of validating one raw delta.
#[derive(Debug, Clone, Copy)]
pub struct StepValidation {
    pub verdict: StepVerdict,
    pub raw_delta: i64,
    /// The amount actually credited: the full delta when accepted, a
    /// conservative estimate on rate/window rejection, zero otherwise.
    pub accepted: u64,
}

/// Anti-cheat validator for one step-sensor stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepValidator {
    config: StepValidatorConfig,
    /// Per-step timestamps within the last minute, expanded from
    /// accepted deltas.
    #[serde(default)]
    window: Vec<DateTime<Utc>>,
    daily_total: u64,
    day: Option<NaiveDate>,
    last_accepted_at: Option<DateTime<Utc>>,
}

impl StepValidator {
    pub fn new() -> Self {
        Self::with_config(StepValidatorConfig::default())
    }

    pub fn with_config(config: StepValidatorConfig) -> Self {
        Self {
            config,
            window: Vec::new(),
            daily_total: 0,
            day: None,
            last_accepted_at: None,
        }
    }

    pub fn config(&self) -> &StepValidatorConfig {
        &self.config
    }

    /// Steps credited so far today.
    pub fn daily_total(&self) -> u64 {
        self.daily_total
    }

    /// Validate a raw delta and credit the accepted amount into the
    /// validator's rolling state. Anomalies are logged at `warn` and
    /// otherwise absorbed; this never returns an error.
    pub fn filter_anomalous_steps(&mut self, raw_delta: i64, at: DateTime<Utc>) -> StepValidation {
        let validation = self.validate(raw_delta, at);
        if validation.verdict != StepVerdict::Accepted {
            log::warn!(
                "step anomaly: {:?} raw_delta={} credited={} daily_total={}",
                validation.verdict,
                validation.raw_delta,
                validation.accepted,
                self.daily_total
            );
        }
        validation
    }

    fn validate(&mut self, raw_delta: i64, at: DateTime<Utc>) -> StepValidation {
        self.roll_day(at);

        // Rule 1: negative deltas are rejected outright.
        if raw_delta < 0 {
            return StepValidation {
                verdict: StepVerdict::NegativeDelta,
                raw_delta,
                accepted: 0,
            };
        }
        let delta = raw_delta as u64;

        // Elapsed time since the last accepted observation. The first
        // sample of a stream has no baseline; it is granted one full
        // window of plausible activity.
        let elapsed_min = self
            .last_accepted_at
            .map(|last| (at - last).num_milliseconds().max(0) as f64 / 60_000.0)
            .unwrap_or(1.0);

        // Rule 2: burst-injection guard on the implied rate.
        let allowed = self.config.max_steps_per_minute as f64 * elapsed_min;
        if delta as f64 > allowed {
            let accepted = self.conservative_estimate(delta, elapsed_min);
            self.commit(accepted, at, elapsed_min);
            return StepValidation {
                verdict: StepVerdict::RateExceeded,
                raw_delta,
                accepted,
            };
        }

        // Rule 3: rolling one-minute window. The delta expands into
        // per-step timestamps spread uniformly over the elapsed
        // interval; only the portion landing inside the window counts.
        self.prune_window(at);
        let incoming = Self::in_window_count(delta, elapsed_min);
        if self.window.len() as u64 + incoming > self.config.window_cap_per_minute {
            let accepted = self.conservative_estimate(delta, elapsed_min);
            self.commit(accepted, at, elapsed_min);
            return StepValidation {
                verdict: StepVerdict::WindowExceeded,
                raw_delta,
                accepted,
            };
        }

        // Rule 4: daily cap. Rejected outright, no estimate.
        if self.daily_total + delta > self.config.max_daily_steps {
            return StepValidation {
                verdict: StepVerdict::DailyCapExceeded,
                raw_delta,
                accepted: 0,
            };
        }

        self.commit(delta, at, elapsed_min);
        StepValidation {
            verdict: StepVerdict::Accepted,
            raw_delta,
            accepted: delta,
        }
    }

    /// Half the maximum plausible rate over the elapsed interval,
    /// clamped to the raw delta and the remaining daily headroom.
    fn conservative_estimate(&self, delta: u64, elapsed_min: f64) -> u64 {
        let estimate = (self.config.max_steps_per_minute as f64 / 2.0 * elapsed_min) as u64;
        let headroom = self.config.max_daily_steps.saturating_sub(self.daily_total);
        estimate.min(delta).min(headroom)
    }

    fn commit(&mut self, accepted: u64, at: DateTime<Utc>, elapsed_min: f64) {
        if accepted == 0 {
            return;
        }
        let in_window = Self::in_window_count(accepted, elapsed_min);
        let span_ms = ((elapsed_min * 60_000.0) as i64).clamp(1, WINDOW_MS);
        for i in 0..in_window {
            let offset = span_ms * i as i64 / in_window.max(1) as i64;
            self.window.push(at - Duration::milliseconds(offset));
        }
        self.daily_total = (self.daily_total + accepted).min(self.config.max_daily_steps);
        self.last_accepted_at = Some(at);
    }

    /// Number of a delta's expanded per-step events that land inside the
    /// one-minute window when spread uniformly over the elapsed interval.
    fn in_window_count(steps: u64, elapsed_min: f64) -> u64 {
        if elapsed_min <= 1.0 {
            steps
        } else {
            (steps as f64 / elapsed_min) as u64
        }
    }

    fn prune_window(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::milliseconds(WINDOW_MS);
        self.window.retain(|t| *t > cutoff);
    }

    fn roll_day(&mut self, at: DateTime<Utc>) {
        let today = at.date_naive();
        if self.day != Some(today) {
            self.day = Some(today);
            self.daily_total = 0;
            self.window.clear();
            self.last_accepted_at = None;
        }
    }
}

impl Default for StepValidator {
    fn default() -> Self {
        Self::new()
    }
}

//! Reward ledger: validated activity in, currency out.
//!
//! The ledger is an append-only collection of granted reward events plus
//! the accepted spends against them. The wallet (total earned, current
//! balance) is derived, never stored independently. `grant` is
//! idempotent on the event id because session completion and step sync
//! may be retried by collaborators after a crash or restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::GrantRequest;

/// Closed set of activities that can mint currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardSource {
    FocusSession,
    StepActivity,
    ManualBonus,
    Milestone,
}

/// An immutable record granting currency units from one validated
/// activity. The id is the idempotent-replay key and is never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub id: String,
    pub amount: u64,
    pub earned_at: DateTime<Utc>,
    pub source: RewardSource,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RewardEvent {
    pub fn new(
        id: impl Into<String>,
        amount: u64,
        source: RewardSource,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            earned_at,
            source,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the terminal-reward event for a session. The id derives
    /// from the session id, so a retried grant replays as a duplicate.
    pub fn for_session(grant: &GrantRequest, earned_at: DateTime<Utc>) -> Self {
        Self::new(
            format!("focus-{}", grant.session_id),
            grant.amount,
            RewardSource::FocusSession,
            earned_at,
        )
        .with_metadata("sessionId", grant.session_id.to_string())
    }
}

/// One accepted spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecord {
    pub amount: u64,
    pub reason: String,
    pub spent_at: DateTime<Utc>,
}

/// Result of a spend request. Insufficient funds is a normal outcome,
/// not an error: callers branch on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendOutcome {
    Committed { balance_after: u64 },
    InsufficientBalance { balance: u64 },
}

impl SpendOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SpendOutcome::Committed { .. })
    }
}

/// Derived wallet state, computed from the full event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub total_earned: u64,
    pub total_spent: u64,
    pub current_balance: u64,
    pub by_source: HashMap<RewardSource, u64>,
}

/// Append-only reward event collection with balance enforcement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardLedger {
    events: Vec<RewardEvent>,
    spends: Vec<SpendRecord>,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reward event. Returns `false` (no-op) when an event with
    /// the same id already exists.
    pub fn grant(&mut self, event: RewardEvent) -> bool {
        if self.events.iter().any(|e| e.id == event.id) {
            log::debug!("duplicate grant ignored: {}", event.id);
            return false;
        }
        self.events.push(event);
        true
    }

    /// Spend from the balance. Rejects without any mutation when the
    /// amount exceeds the current balance; otherwise commits atomically.
    pub fn spend(
        &mut self,
        amount: u64,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> SpendOutcome {
        let balance = self.balance();
        if amount > balance {
            return SpendOutcome::InsufficientBalance { balance };
        }
        self.spends.push(SpendRecord {
            amount,
            reason: reason.into(),
            spent_at: now,
        });
        SpendOutcome::Committed {
            balance_after: balance - amount,
        }
    }

    // ── Derived queries ──────────────────────────────────────────────

    pub fn total_earned(&self) -> u64 {
        self.events.iter().map(|e| e.amount).sum()
    }

    pub fn total_spent(&self) -> u64 {
        self.spends.iter().map(|s| s.amount).sum()
    }

    pub fn balance(&self) -> u64 {
        self.total_earned() - self.total_spent()
    }

    /// Total ever earned from one source.
    pub fn balance_by_source(&self, source: RewardSource) -> u64 {
        self.events
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.amount)
            .sum()
    }

    /// Units earned on the current day.
    pub fn total_today(&self, now: DateTime<Utc>) -> u64 {
        let today = now.date_naive();
        self.events
            .iter()
            .filter(|e| e.earned_at.date_naive() == today)
            .map(|e| e.amount)
            .sum()
    }

    pub fn wallet(&self) -> WalletSnapshot {
        let mut by_source = HashMap::new();
        for event in &self.events {
            *by_source.entry(event.source).or_insert(0) += event.amount;
        }
        let total_earned = self.total_earned();
        let total_spent = self.total_spent();
        WalletSnapshot {
            total_earned,
            total_spent,
            current_balance: total_earned - total_spent,
            by_source,
        }
    }

    pub fn events(&self) -> &[RewardEvent] {
        &self.events
    }

    pub fn spends(&self) -> &[SpendRecord] {
        &self.spends
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::RewardSource;

/// Every state change in the system produces an Event.
/// The GUI polls for events; the orchestrator subscribes to them.
/// Events are delivered in the order the mutations occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        elapsed_ms: u64,
        amount_granted: u64,
        at: DateTime<Utc>,
    },
    /// Session ended without reward: countdown expired with integrity broken,
    /// or the out-of-focus threshold was exceeded mid-flight.
    SessionFailed {
        session_id: String,
        out_of_focus_ms: u64,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// A step sample was processed. `accepted` may be lower than `raw_delta`
    /// when the anti-cheat validator downgraded the sample.
    StepsRecorded {
        raw_delta: u64,
        accepted: u64,
        daily_total: u64,
        at: DateTime<Utc>,
    },
    RewardGranted {
        event_id: String,
        amount: u64,
        source: RewardSource,
        at: DateTime<Utc>,
    },
    SpendCommitted {
        amount: u64,
        reason: String,
        balance_after: u64,
        at: DateTime<Utc>,
    },
    SpendRejected {
        amount: u64,
        reason: String,
        balance: u64,
        at: DateTime<Utc>,
    },
}

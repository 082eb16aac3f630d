//! Bounded history of terminal sessions.
//!
//! Sessions are discarded on terminal transition but summarized into a
//! most-recent-N record list that persists across restarts.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::SessionRecord;

const DEFAULT_HISTORY_CAP: usize = 100;

/// Most-recent-N summaries of finished sessions, newest last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    cap: usize,
    records: VecDeque<SessionRecord>,
}

impl SessionHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            records: VecDeque::new(),
        }
    }

    /// Append a terminal session summary, evicting the oldest entry
    /// once the bound is reached.
    pub fn push(&mut self, record: SessionRecord) {
        if self.records.len() == self.cap {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&SessionRecord> {
        self.records.back()
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{FocusSession, SessionConfig};
    use chrono::Utc;

    fn record() -> SessionRecord {
        let mut s = FocusSession::new(60_000, SessionConfig::default());
        let now = Utc::now();
        s.start(now).unwrap();
        s.cancel(now).unwrap();
        s.to_record(now)
    }

    #[test]
    fn keeps_most_recent_n() {
        let mut h = SessionHistory::new(3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let r = record();
            ids.push(r.id);
            h.push(r);
        }
        assert_eq!(h.len(), 3);
        let kept: Vec<_> = h.iter().map(|r| r.id).collect();
        assert_eq!(kept, ids[2..].to_vec());
        assert_eq!(h.latest().unwrap().id, ids[4]);
    }

    #[test]
    fn survives_serde_round_trip() {
        let mut h = SessionHistory::new(10);
        h.push(record());
        let json = serde_json::to_string(&h).unwrap();
        let back: SessionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
    }
}

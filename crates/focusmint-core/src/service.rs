//! Orchestration: wires validated activity into ledger grants.
//!
//! [`Orchestrator`] owns one session, the step validator, the ledger and
//! the bounded history, and applies every mutation synchronously with an
//! explicit `now`, appending an [`Event`] per state change in mutation
//! order. It holds no clock and no thread of its own.
//!
//! [`FocusService`] is the async owner for multi-producer runtimes: a
//! `tokio::sync::Mutex` serializes the tick task, lifecycle signals and
//! sensor samples into the orchestrator, and a per-session tick task
//! (cancelled on pause/cancel/terminal) drives the 1-second countdown.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CoreError, SessionError};
use crate::events::Event;
use crate::ledger::{RewardEvent, RewardLedger, RewardSource, SpendOutcome, WalletSnapshot};
use crate::session::{FocusSession, SessionHistory, SessionStatus, TerminalOutcome};
use crate::storage::{self, BlobStore, Config};
use crate::validator::{StepValidation, StepValidator};

/// Step-stream state that survives restarts alongside the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StepState {
    validator: Option<StepValidator>,
    /// Last cumulative sensor reading, the baseline for delta computation.
    last_sample: Option<u64>,
    /// Validated steps not yet converted into a currency unit.
    unminted_steps: u64,
}

/// Read-only view of the current session for collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub status: SessionStatus,
    pub remaining_ms: u64,
    pub progress: f64,
    pub out_of_focus_ms: u64,
}

/// Read-only snapshot exposed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session: Option<SessionView>,
    pub wallet: WalletSnapshot,
    pub steps_today: u64,
}

/// Single logical owner of session, validators and ledger.
pub struct Orchestrator {
    config: Config,
    session: Option<FocusSession>,
    ledger: RewardLedger,
    steps: StepValidator,
    history: SessionHistory,
    last_step_sample: Option<u64>,
    unminted_steps: u64,
    pending_events: Vec<Event>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let steps = StepValidator::with_config(config.step_config());
        let history = SessionHistory::new(config.history_cap);
        Self {
            config,
            session: None,
            ledger: RewardLedger::new(),
            steps,
            history,
            last_step_sample: None,
            unminted_steps: 0,
            pending_events: Vec::new(),
        }
    }

    /// Restore persisted state from the blob store. Missing keys fall
    /// back to fresh state.
    pub fn load(config: Config, store: &dyn BlobStore) -> Result<Self, CoreError> {
        let mut orch = Self::new(config);
        if let Some(ledger) = storage::load_json(store, storage::LEDGER_KEY)? {
            orch.ledger = ledger;
        }
        if let Some(history) = storage::load_json(store, storage::HISTORY_KEY)? {
            orch.history = history;
        }
        if let Some(session) = storage::load_json::<Option<FocusSession>>(store, storage::SESSION_KEY)? {
            orch.session = session;
        }
        if let Some(state) = storage::load_json::<StepState>(store, storage::STEP_STATE_KEY)? {
            if let Some(validator) = state.validator {
                orch.steps = validator;
            }
            orch.last_step_sample = state.last_sample;
            orch.unminted_steps = state.unminted_steps;
        }
        Ok(orch)
    }

    /// Persist the reward collection, history and in-flight state.
    /// Every value serializes fully before any write and all four blobs
    /// land in one atomic batch, so the durable ledger and the durable
    /// step baseline can never diverge; a failed save leaves in-memory
    /// state untouched as the source of truth.
    pub fn save(&self, store: &dyn BlobStore) -> Result<(), CoreError> {
        let step_state = StepState {
            validator: Some(self.steps.clone()),
            last_sample: self.last_step_sample,
            unminted_steps: self.unminted_steps,
        };
        let ledger = serde_json::to_vec(&self.ledger)?;
        let history = serde_json::to_vec(&self.history)?;
        let session = serde_json::to_vec(&self.session)?;
        let steps = serde_json::to_vec(&step_state)?;
        store.put_many(&[
            (storage::LEDGER_KEY, ledger.as_slice()),
            (storage::HISTORY_KEY, history.as_slice()),
            (storage::SESSION_KEY, session.as_slice()),
            (storage::STEP_STATE_KEY, steps.as_slice()),
        ])?;
        Ok(())
    }

    // ── Session commands ─────────────────────────────────────────────

    /// Create and start a session. Fails when a session is in flight.
    pub fn start_session(&mut self, duration_ms: u64, now: DateTime<Utc>) -> Result<Uuid, SessionError> {
        if let Some(session) = &self.session {
            if !session.status().is_terminal() {
                return Err(SessionError::NotStartable(session.status()));
            }
        }
        let mut session = FocusSession::new(duration_ms, self.config.session_config());
        session.start(now)?;
        let id = session.id();
        self.pending_events.push(Event::SessionStarted {
            session_id: id.to_string(),
            duration_ms,
            at: now,
        });
        self.session = Some(session);
        Ok(id)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        session.pause(now)?;
        self.pending_events.push(Event::SessionPaused {
            session_id: session.id().to_string(),
            remaining_ms: session.remaining_ms(),
            at: now,
        });
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        session.resume(now)?;
        self.pending_events.push(Event::SessionResumed {
            session_id: session.id().to_string(),
            remaining_ms: session.remaining_ms(),
            at: now,
        });
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        let outcome = session.cancel(now)?;
        self.settle_terminal(outcome, now);
        Ok(())
    }

    /// Forwarded OS lifecycle signal.
    pub fn mark_background(&mut self, now: DateTime<Utc>) {
        if let Some(session) = &mut self.session {
            session.mark_background(now);
        }
    }

    /// Forwarded OS lifecycle signal.
    pub fn mark_foreground(&mut self, now: DateTime<Utc>) {
        if let Some(session) = &mut self.session {
            session.mark_foreground(now);
        }
    }

    /// Drive the countdown. Returns the terminal status when this tick
    /// ended the session.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<SessionStatus> {
        let session = self.session.as_mut()?;
        let outcome = session.tick(now)?;
        let status = outcome.status;
        self.settle_terminal(outcome, now);
        Some(status)
    }

    /// Terminal transition side effect: exactly one grant request into
    /// the ledger, then summarize into the bounded history.
    fn settle_terminal(&mut self, outcome: TerminalOutcome, now: DateTime<Utc>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let session_id = session.id().to_string();

        self.pending_events.push(match outcome.status {
            SessionStatus::Completed => Event::SessionCompleted {
                session_id: session_id.clone(),
                elapsed_ms: session.elapsed_ms(),
                amount_granted: outcome.grant.amount,
                at: now,
            },
            SessionStatus::Failed => Event::SessionFailed {
                session_id: session_id.clone(),
                out_of_focus_ms: session.out_of_focus_ms(now),
                at: now,
            },
            _ => Event::SessionCancelled {
                session_id: session_id.clone(),
                at: now,
            },
        });

        let reward = RewardEvent::for_session(&outcome.grant, now);
        let event_id = reward.id.clone();
        if self.ledger.grant(reward) {
            self.pending_events.push(Event::RewardGranted {
                event_id,
                amount: outcome.grant.amount,
                source: RewardSource::FocusSession,
                at: now,
            });
        }

        let record = session.to_record(now);
        self.history.push(record);
    }

    // ── Step telemetry ───────────────────────────────────────────────

    /// Feed one cumulative sensor sample. The delta against the previous
    /// sample runs through the anti-cheat validator; a counter
    /// regression (device reboot) re-baselines instead of producing a
    /// negative delta.
    pub fn record_step_sample(&mut self, cumulative: u64, now: DateTime<Utc>) -> StepValidation {
        let delta = match self.last_step_sample {
            Some(prev) if cumulative >= prev => (cumulative - prev) as i64,
            Some(_) => {
                log::debug!("step counter regressed, re-baselining at {cumulative}");
                0
            }
            None => 0,
        };
        self.last_step_sample = Some(cumulative);
        self.record_step_delta(delta, now)
    }

    /// Feed a pre-computed step delta.
    pub fn record_step_delta(&mut self, delta: i64, now: DateTime<Utc>) -> StepValidation {
        let validation = self.steps.filter_anomalous_steps(delta, now);
        self.pending_events.push(Event::StepsRecorded {
            raw_delta: delta.max(0) as u64,
            accepted: validation.accepted,
            daily_total: self.steps.daily_total(),
            at: now,
        });

        self.unminted_steps += validation.accepted;
        let steps_per_unit = self.config.steps.steps_per_unit.max(1);
        let units = self.unminted_steps / steps_per_unit;
        if units > 0 {
            self.unminted_steps %= steps_per_unit;
            // The id derives from the day and the post-accept daily
            // total, so a collaborator retrying the same sync after a
            // crash collides into the existing ledger entry.
            let reward = RewardEvent::new(
                format!("steps-{}-{}", now.date_naive(), self.steps.daily_total()),
                units,
                RewardSource::StepActivity,
                now,
            )
            .with_metadata("steps", validation.accepted.to_string());
            let event_id = reward.id.clone();
            if self.ledger.grant(reward) {
                self.pending_events.push(Event::RewardGranted {
                    event_id,
                    amount: units,
                    source: RewardSource::StepActivity,
                    at: now,
                });
            }
        }
        validation
    }

    // ── Wallet ───────────────────────────────────────────────────────

    pub fn spend(&mut self, amount: u64, reason: &str, now: DateTime<Utc>) -> SpendOutcome {
        let outcome = self.ledger.spend(amount, reason, now);
        self.pending_events.push(match outcome {
            SpendOutcome::Committed { balance_after } => Event::SpendCommitted {
                amount,
                reason: reason.to_string(),
                balance_after,
                at: now,
            },
            SpendOutcome::InsufficientBalance { balance } => Event::SpendRejected {
                amount,
                reason: reason.to_string(),
                balance,
                at: now,
            },
        });
        outcome
    }

    /// Out-of-band grant (promotions, milestones). Returns `false` on
    /// duplicate id.
    pub fn grant_bonus(
        &mut self,
        amount: u64,
        source: RewardSource,
        note: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let reward = RewardEvent::new(Uuid::new_v4().to_string(), amount, source, now)
            .with_metadata("note", note);
        let event_id = reward.id.clone();
        let granted = self.ledger.grant(reward);
        if granted {
            self.pending_events.push(Event::RewardGranted {
                event_id,
                amount,
                source,
                at: now,
            });
        }
        granted
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            session: self.session.as_ref().map(|s| SessionView {
                id: s.id(),
                status: s.status(),
                remaining_ms: s.remaining_ms(),
                progress: s.progress(),
                out_of_focus_ms: s.out_of_focus_ms(now),
            }),
            wallet: self.ledger.wallet(),
            steps_today: self.steps.daily_total(),
        }
    }

    pub fn session(&self) -> Option<&FocusSession> {
        self.session.as_ref()
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Take the events accumulated since the last drain, in the order
    /// the mutations occurred.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}

// ── Async owner ──────────────────────────────────────────────────────

struct ServiceInner {
    orch: Orchestrator,
    store: Option<Box<dyn BlobStore + Send>>,
    events_tx: mpsc::UnboundedSender<Event>,
    tick_cancel: Option<CancellationToken>,
}

impl ServiceInner {
    /// Forward drained events in order and persist. Command paths
    /// propagate a save failure; the tick task logs it instead.
    fn flush(&mut self) -> Result<(), CoreError> {
        for event in self.orch.drain_events() {
            // Receiver dropped just means nobody is listening.
            let _ = self.events_tx.send(event);
        }
        if let Some(store) = &self.store {
            self.orch.save(store.as_ref())?;
        }
        Ok(())
    }

    fn stop_ticking(&mut self) {
        if let Some(token) = self.tick_cancel.take() {
            token.cancel();
        }
    }
}

/// Async front door for the core: one owning task per wallet/session,
/// mutations serialized through a single mutex.
pub struct FocusService {
    inner: Arc<Mutex<ServiceInner>>,
}

impl FocusService {
    /// Build the service, restoring state from the store when one is
    /// given. Returns the ordered event stream alongside the service.
    pub fn new(
        config: Config,
        store: Option<Box<dyn BlobStore + Send>>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>), CoreError> {
        let orch = match &store {
            Some(store) => Orchestrator::load(config, store.as_ref())?,
            None => Orchestrator::new(config),
        };
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let service = Self {
            inner: Arc::new(Mutex::new(ServiceInner {
                orch,
                store,
                events_tx,
                tick_cancel: None,
            })),
        };
        Ok((service, events_rx))
    }

    pub async fn start_session(&self, duration_ms: u64) -> Result<Uuid, CoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.orch.start_session(duration_ms, Utc::now())?;
        self.spawn_tick_task(&mut inner);
        inner.flush()?;
        Ok(id)
    }

    pub async fn pause(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        inner.orch.pause(Utc::now())?;
        inner.stop_ticking();
        inner.flush()?;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        inner.orch.resume(Utc::now())?;
        self.spawn_tick_task(&mut inner);
        inner.flush()?;
        Ok(())
    }

    pub async fn cancel(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        inner.orch.cancel(Utc::now())?;
        inner.stop_ticking();
        inner.flush()?;
        Ok(())
    }

    pub async fn notify_background(&self) {
        let mut inner = self.inner.lock().await;
        inner.orch.mark_background(Utc::now());
    }

    pub async fn notify_foreground(&self) {
        let mut inner = self.inner.lock().await;
        inner.orch.mark_foreground(Utc::now());
    }

    pub async fn record_steps(&self, cumulative: u64) -> Result<StepValidation, CoreError> {
        let mut inner = self.inner.lock().await;
        let validation = inner.orch.record_step_sample(cumulative, Utc::now());
        inner.flush()?;
        Ok(validation)
    }

    pub async fn spend(&self, amount: u64, reason: &str) -> Result<SpendOutcome, CoreError> {
        let mut inner = self.inner.lock().await;
        let outcome = inner.orch.spend(amount, reason, Utc::now());
        inner.flush()?;
        Ok(outcome)
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        inner.orch.snapshot(Utc::now())
    }

    /// Spawn the 1-second tick loop for the active session. The token
    /// stops further scheduling; an in-flight tick that already mutated
    /// state is never undone.
    fn spawn_tick_task(&self, inner: &mut ServiceInner) {
        inner.stop_ticking();
        let token = CancellationToken::new();
        inner.tick_cancel = Some(token.clone());
        let state = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(StdDuration::from_secs(1));
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let mut inner = state.lock().await;
                        let terminal = inner.orch.tick(Utc::now());
                        if let Err(e) = inner.flush() {
                            log::error!("tick persistence failed: {e}");
                        }
                        if terminal.is_some() {
                            inner.stop_ticking();
                            break;
                        }
                    }
                }
            }
        });
    }
}

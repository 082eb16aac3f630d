//! # Focusmint Core Library
//!
//! Core business logic for Focusmint: validated real-world activity in,
//! in-app currency out, under invariant balance accounting. The CLI
//! binary and any GUI shell are thin layers over this library.
//!
//! ## Architecture
//!
//! - **Session**: a wall-clock-based focus-session state machine; the
//!   owning runner calls `tick()` once per second while active
//! - **Validators**: plausibility rules for attention integrity and
//!   step telemetry, sharing a "reject or clamp" contract
//! - **Ledger**: append-only reward events with idempotent grants and
//!   atomic spends; the wallet is derived, never stored
//! - **Service**: single-owner orchestration, async tick loop, ordered
//!   event stream
//! - **Storage**: a key→blob contract with a bundled SQLite
//!   implementation, plus TOML configuration
//!
//! ## Key components
//!
//! - [`FocusSession`]: session state machine
//! - [`StepValidator`]: step anti-cheat filter
//! - [`RewardLedger`]: balance-invariant currency accounting
//! - [`FocusService`] / [`Orchestrator`]: command entry points

pub mod error;
pub mod events;
pub mod ledger;
pub mod service;
pub mod session;
pub mod storage;
pub mod validator;

pub use error::{ConfigError, CoreError, DatabaseError, SessionError};
pub use events::Event;
pub use ledger::{RewardEvent, RewardLedger, RewardSource, SpendOutcome, WalletSnapshot};
pub use service::{FocusService, Orchestrator, SessionView, Snapshot};
pub use session::{FocusSession, SessionConfig, SessionHistory, SessionRecord, SessionStatus};
pub use storage::{BlobStore, Config, Database};
pub use validator::{
    AttentionValidator, StepValidation, StepValidator, StepValidatorConfig, StepVerdict,
};

//! Activity validators.
//!
//! Stateless-per-entity plausibility rules that decide whether a raw
//! telemetry delta may be rewarded. Two specializations share the same
//! "reject or clamp" contract:
//!
//! - [`AttentionValidator`]: foreground/background integrity during a
//!   focus session.
//! - [`StepValidator`]: anti-cheat filtering of step-count deltas.

mod attention;
mod steps;

pub use attention::AttentionValidator;
pub use steps::{StepValidation, StepValidator, StepValidatorConfig, StepVerdict};

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use super::{open_state, print_events};

#[derive(Subcommand)]
pub enum StepsAction {
    /// Submit a cumulative step-counter sample
    Record {
        /// Cumulative step count as reported by the sensor
        count: u64,
    },
    /// Print today's validated step total
    Today,
}

pub fn run(action: StepsAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut orch, db) = open_state()?;
    let now = Utc::now();
    orch.tick(now);

    match action {
        StepsAction::Record { count } => {
            let validation = orch.record_step_sample(count, now);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "verdict": validation.verdict,
                    "rawDelta": validation.raw_delta,
                    "accepted": validation.accepted,
                }))?
            );
        }
        StepsAction::Today => {
            let snapshot = orch.snapshot(now);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "stepsToday": snapshot.steps_today,
                }))?
            );
        }
    }

    print_events(&orch.drain_events())?;
    orch.save(&db)?;
    Ok(())
}

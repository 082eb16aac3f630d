use chrono::Utc;
use clap::Subcommand;
use focusmint_core::{Config, Database, Event, FocusService};

use super::{open_state, print_events};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a focus session
    Start {
        /// Planned duration in minutes (defaults to the configured value)
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Pause the active session
    Pause,
    /// Resume a paused session
    Resume,
    /// Cancel the session (amount forced to zero)
    Cancel,
    /// Flush the countdown and print the current snapshot as JSON
    Status,
    /// Forward an app-backgrounded lifecycle signal
    Background,
    /// Forward an app-foregrounded lifecycle signal
    Foreground,
    /// Run a session live, printing events until it ends
    Watch {
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Print the bounded session history as JSON
    History,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    if let SessionAction::Watch { minutes } = action {
        return watch(minutes);
    }

    let (mut orch, db) = open_state()?;
    let now = Utc::now();
    // Catch up on wall-clock time that passed between invocations; a
    // countdown that expired while we were away settles here.
    orch.tick(now);

    match action {
        SessionAction::Start { minutes } => {
            let config = Config::load()?;
            let minutes = minutes.unwrap_or(config.session.default_duration_min);
            orch.start_session(minutes * 60_000, now)?;
        }
        SessionAction::Pause => orch.pause(now)?,
        SessionAction::Resume => orch.resume(now)?,
        SessionAction::Cancel => orch.cancel(now)?,
        SessionAction::Background => orch.mark_background(now),
        SessionAction::Foreground => orch.mark_foreground(now),
        SessionAction::Status => {
            println!("{}", serde_json::to_string_pretty(&orch.snapshot(now))?);
        }
        SessionAction::History => {
            let records: Vec<_> = orch.history().iter().collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        SessionAction::Watch { .. } => unreachable!(),
    }

    print_events(&orch.drain_events())?;
    orch.save(&db)?;
    Ok(())
}

/// Drive a session with the live 1-second tick loop.
fn watch(minutes: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = Config::load()?;
        let minutes = minutes.unwrap_or(config.session.default_duration_min);
        let db = Database::open()?;
        let (service, mut events) = FocusService::new(config, Some(Box::new(db)))?;
        service.start_session(minutes * 60_000).await?;

        while let Some(event) = events.recv().await {
            println!("{}", serde_json::to_string(&event)?);
            if matches!(
                event,
                Event::SessionCompleted { .. }
                    | Event::SessionFailed { .. }
                    | Event::SessionCancelled { .. }
            ) {
                // The terminal grant lands in the same batch; drain it.
                while let Ok(event) = events.try_recv() {
                    println!("{}", serde_json::to_string(&event)?);
                }
                break;
            }
        }
        Ok(())
    })
}

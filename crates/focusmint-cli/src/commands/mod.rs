pub mod config;
pub mod session;
pub mod steps;
pub mod wallet;

use focusmint_core::{Config, Database, Event, Orchestrator};

/// Load the orchestrator from the on-disk store. Each CLI invocation is
/// one serialized mutation: load, apply, save.
pub fn open_state() -> Result<(Orchestrator, Database), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;
    let orch = Orchestrator::load(config, &db)?;
    Ok((orch, db))
}

/// Print drained events as JSON lines, in mutation order.
pub fn print_events(events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

mod history;
mod machine;

pub use history::SessionHistory;
pub use machine::{
    FocusSession, GrantRequest, SessionConfig, SessionRecord, SessionStatus, TerminalOutcome,
};

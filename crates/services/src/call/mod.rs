mod cleanup;
mod orchestrator;
mod roster;

pub use cleanup::{CleanupStep, run_cleanup};
pub use orchestrator::{CallError, CallOrchestrator, CallResult};
pub use roster::{Roster, RosterEntry, RosterRole};

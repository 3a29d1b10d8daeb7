mod job;
mod state;

pub use job::{ItemFailure, Phase, RetryConfig, RunSummary};
pub use state::{PhaseTransition, RunEvent, RunState, StateMachine};

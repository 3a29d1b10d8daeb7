use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::Phase;

/// The three states of a submission run.
///
/// A run flows through: SUBMITTING → DRAINING → DONE, or straight from
/// SUBMITTING to DONE when the drain is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Submitting,
    Draining,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Submitting => write!(f, "SUBMITTING"),
            RunState::Draining => write!(f, "DRAINING"),
            RunState::Done => write!(f, "DONE"),
        }
    }
}

/// What a run has just finished doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// Every item has been submitted or skipped.
    ItemsExhausted,
    /// A drain poll observed this many active jobs.
    Polled { active: usize },
}

/// A phase change observed for one job between two reconciliation cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub name: String,
    pub from: Phase,
    pub to: Phase,
}

impl PhaseTransition {
    /// Transitions into a terminal phase are the ones that trigger archival.
    pub fn enters_terminal(&self) -> bool {
        self.from != self.to && self.to.is_terminal()
    }
}

/// Drives a run through its states.
pub struct StateMachine {
    wait_for_completion: bool,
}

impl StateMachine {
    pub fn new(wait_for_completion: bool) -> Self {
        Self {
            wait_for_completion,
        }
    }

    /// Compute the state that follows `state` after `event`.
    ///
    /// - `Submitting` ends when items are exhausted, moving to `Draining`
    ///   (or `Done` when not waiting for completion).
    /// - `Draining` ends on the first poll that sees no active jobs.
    /// - `Done` is terminal.
    pub fn next(&self, state: RunState, event: RunEvent) -> RunState {
        match (state, event) {
            (RunState::Submitting, RunEvent::ItemsExhausted) => {
                if self.wait_for_completion {
                    RunState::Draining
                } else {
                    RunState::Done
                }
            }
            (RunState::Draining, RunEvent::Polled { active: 0 }) => RunState::Done,
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_run_walks_all_states() {
        let sm = StateMachine::new(true);
        let s = sm.next(RunState::Submitting, RunEvent::ItemsExhausted);
        assert_eq!(s, RunState::Draining);

        let s = sm.next(s, RunEvent::Polled { active: 2 });
        assert_eq!(s, RunState::Draining);

        let s = sm.next(s, RunEvent::Polled { active: 0 });
        assert_eq!(s, RunState::Done);

        // Done is terminal.
        assert_eq!(sm.next(s, RunEvent::Polled { active: 5 }), RunState::Done);
    }

    #[test]
    fn nowait_run_skips_drain() {
        let sm = StateMachine::new(false);
        assert_eq!(
            sm.next(RunState::Submitting, RunEvent::ItemsExhausted),
            RunState::Done
        );
    }

    #[test]
    fn polls_do_not_end_submission() {
        let sm = StateMachine::new(true);
        assert_eq!(
            sm.next(RunState::Submitting, RunEvent::Polled { active: 0 }),
            RunState::Submitting
        );
    }

    #[test]
    fn terminal_entry_requires_a_change() {
        let t = PhaseTransition {
            name: "a".into(),
            from: Phase::Running,
            to: Phase::Succeeded,
        };
        assert!(t.enters_terminal());

        let t = PhaseTransition {
            name: "a".into(),
            from: Phase::Succeeded,
            to: Phase::Succeeded,
        };
        assert!(!t.enters_terminal());

        let t = PhaseTransition {
            name: "a".into(),
            from: Phase::Succeeded,
            to: Phase::Running,
        };
        assert!(!t.enters_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(RunState::Submitting.to_string(), "SUBMITTING");
        assert_eq!(RunState::Draining.to_string(), "DRAINING");
        assert_eq!(RunState::Done.to_string(), "DONE");
    }
}

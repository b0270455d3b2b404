//! Navigation state machine
//!
//! [`NavState`] has exactly one active value. Every change goes through
//! [`StateMachine::transition`], which rejects edges the navigator must
//! never take and returns a [`Transition`] record for the ones it does.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Navigation execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavState {
    /// No goal
    #[default]
    Idle,
    /// Driving toward the active goal
    Navigating,
    /// Final goal reached
    GoalReached,
    /// No safe motion (or no usable input) for too many ticks
    Blocked,
    /// Goal cancelled or replaced before it was reached
    Aborted,
    /// Setup fault; cleared only by reconfiguration
    Error,
}

impl NavState {
    /// States in which the navigator computes motion
    pub fn is_active(&self) -> bool {
        matches!(self, NavState::Navigating | NavState::Blocked)
    }

    /// States that end the current goal
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavState::GoalReached | NavState::Aborted | NavState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NavState::Idle => "IDLE",
            NavState::Navigating => "NAVIGATING",
            NavState::GoalReached => "GOAL_REACHED",
            NavState::Blocked => "BLOCKED",
            NavState::Aborted => "ABORTED",
            NavState::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for NavState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    GoalSet,
    GoalReplaced,
    GoalReached,
    Cancelled,
    NoFeasibleCandidate,
    InputLoss,
    Unblocked,
    Fault,
    Reconfigured,
    Deactivated,
}

/// A recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: NavState,
    pub to: NavState,
    pub cause: TransitionCause,
}

/// Owner of the single active [`NavState`]
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: NavState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Whether `from -> to` is a legal edge
    pub fn is_allowed(from: NavState, to: NavState) -> bool {
        use NavState::*;
        if from == to {
            return false;
        }
        match (from, to) {
            (_, Error) => true,
            (_, Idle) => true,
            (Error, _) => false,
            (Idle | GoalReached | Aborted, Navigating) => true,
            (Navigating, GoalReached | Blocked | Aborted) => true,
            (Blocked, Navigating | GoalReached | Aborted) => true,
            _ => false,
        }
    }

    /// Move to `to`, returning the transition if the edge is legal
    pub fn transition(&mut self, to: NavState, cause: TransitionCause) -> Option<Transition> {
        let from = self.state;
        if !Self::is_allowed(from, to) {
            debug!("Ignoring state change {} -> {} ({:?})", from, to, cause);
            return None;
        }
        self.state = to;
        info!("Navigation state {} -> {} ({:?})", from, to, cause);
        Some(Transition { from, to, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NavState::Idle, NavState::Navigating, true)]
    #[case(NavState::Navigating, NavState::GoalReached, true)]
    #[case(NavState::Navigating, NavState::Blocked, true)]
    #[case(NavState::Blocked, NavState::Navigating, true)]
    #[case(NavState::Blocked, NavState::Aborted, true)]
    #[case(NavState::GoalReached, NavState::Navigating, true)]
    #[case(NavState::Aborted, NavState::Navigating, true)]
    #[case(NavState::Navigating, NavState::Error, true)]
    #[case(NavState::Error, NavState::Idle, true)]
    #[case(NavState::Idle, NavState::Blocked, false)]
    #[case(NavState::Idle, NavState::GoalReached, false)]
    #[case(NavState::Error, NavState::Navigating, false)]
    #[case(NavState::GoalReached, NavState::Blocked, false)]
    #[case(NavState::Navigating, NavState::Navigating, false)]
    fn test_allowed_edges(#[case] from: NavState, #[case] to: NavState, #[case] allowed: bool) {
        assert_eq!(StateMachine::is_allowed(from, to), allowed);
    }

    #[test]
    fn test_transition_records_edge() {
        let mut machine = StateMachine::new();
        let t = machine.transition(NavState::Navigating, TransitionCause::GoalSet).unwrap();
        assert_eq!(t.from, NavState::Idle);
        assert_eq!(t.to, NavState::Navigating);
        assert_eq!(machine.state(), NavState::Navigating);

        assert!(machine.transition(NavState::Navigating, TransitionCause::GoalSet).is_none());
        assert!(machine.transition(NavState::Idle, TransitionCause::Deactivated).is_some());
    }

    #[test]
    fn test_error_is_sticky() {
        let mut machine = StateMachine::new();
        machine.transition(NavState::Error, TransitionCause::Fault);
        assert!(machine.transition(NavState::Navigating, TransitionCause::GoalSet).is_none());
        assert_eq!(machine.state(), NavState::Error);
    }
}

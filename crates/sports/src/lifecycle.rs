use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Progress of a tracked event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Scheduled, not started
    Preview,
    /// In play
    Live,
    /// Break between periods
    Intermission,
    /// Finished (terminal)
    Complete,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Complete)
    }

    /// Whether a schedule entry in this state is worth watching.
    pub fn is_trackable(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Preview => "preview",
            LifecycleState::Live => "live",
            LifecycleState::Intermission => "intermission",
            LifecycleState::Complete => "complete",
        };
        write!(f, "{}", s)
    }
}

/// Inputs to the lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The scheduled start time elapsed
    StartTimeReached,
    /// A poll classified the event as this state
    Observed(LifecycleState),
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::StartTimeReached => write!(f, "start_time_reached"),
            LifecycleEvent::Observed(state) => write!(f, "observed_{}", state),
        }
    }
}

/// Apply an event to the current state, returning the new state.
///
/// Pure function. `Preview` only leaves via `StartTimeReached`, so a poll
/// result can never move an event straight from `Preview` to `Complete`.
pub fn apply_event(
    current: LifecycleState,
    event: &LifecycleEvent,
) -> Result<LifecycleState, TransitionError> {
    if current.is_terminal() {
        return Err(invalid(current, event, "event is complete"));
    }

    match (current, event) {
        (LifecycleState::Preview, LifecycleEvent::StartTimeReached) => Ok(LifecycleState::Live),
        (LifecycleState::Preview, LifecycleEvent::Observed(_)) => {
            Err(invalid(current, event, "event has not started"))
        }
        (_, LifecycleEvent::StartTimeReached) => {
            Err(invalid(current, event, "event already started"))
        }
        // Providers occasionally report pre-game status after start; hold position.
        (_, LifecycleEvent::Observed(LifecycleState::Preview)) => Ok(current),
        (_, LifecycleEvent::Observed(next)) => Ok(*next),
    }
}

fn invalid(from: LifecycleState, event: &LifecycleEvent, reason: &str) -> TransitionError {
    TransitionError::InvalidTransition {
        from,
        event: event.to_string(),
        reason: reason.to_string(),
    }
}

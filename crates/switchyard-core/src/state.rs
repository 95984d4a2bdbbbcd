//! Lifecycle states shared by every media graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a media graph.
///
/// States are ordered: a graph moves `Null -> Ready -> Paused -> Playing`
/// when going up and back down the same ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// No resources allocated
    #[default]
    Null,
    /// Resources allocated, no data flowing
    Ready,
    /// Prerolled: first buffers queued, clock stopped
    Paused,
    /// Data flowing to the outputs
    Playing,
}

impl State {
    /// Lower-case name, as used in logs and on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Ready => "ready",
            Self::Paused => "paused",
            Self::Playing => "playing",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeSuccess {
    /// The transition completed synchronously
    Success,
    /// The transition continues in the background; completion arrives as an event
    Async,
    /// Completed, but the graph is live and cannot preroll in PAUSED
    NoPreroll,
}

/// A transition request the graph rejected immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("state change failed")]
pub struct StateChangeError;

/// Payload of a state-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub old: State,
    pub new: State,
    /// Final target still being worked towards, `None` once settled
    pub pending: Option<State>,
}

impl StateChange {
    /// Create a settled transition (nothing pending).
    #[must_use]
    pub fn settled(old: State, new: State) -> Self {
        Self { old, new, pending: None }
    }

    /// Whether the transition has fully completed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(State::Null < State::Ready);
        assert!(State::Ready < State::Paused);
        assert!(State::Paused < State::Playing);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&State::Playing).unwrap();
        assert_eq!(json, "\"playing\"");
        assert_eq!(State::Paused.to_string(), "paused");
    }

    #[test]
    fn test_settled_transition() {
        let change = StateChange::settled(State::Ready, State::Paused);
        assert!(change.is_settled());

        let in_flight = StateChange {
            old: State::Ready,
            new: State::Paused,
            pending: Some(State::Playing),
        };
        assert!(!in_flight.is_settled());
    }
}

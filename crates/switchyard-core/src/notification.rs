//! Notifications published to controllers.

use serde::{Deserialize, Serialize};

use crate::event::ElementPath;
use crate::graph::{GraphId, GraphKind, MediaGraph};
use crate::state::State;

/// Snapshot of a graph, safe to hand to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub id: GraphId,
    pub kind: GraphKind,
    pub has_video: bool,
    pub has_audio: bool,
}

impl GraphInfo {
    /// Capture a graph's identity and capabilities.
    #[must_use]
    pub fn of(graph: &dyn MediaGraph) -> Self {
        Self {
            id: graph.id(),
            kind: graph.kind(),
            has_video: graph.has_video(),
            has_audio: graph.has_audio(),
        }
    }
}

/// Whether a graph reported an error or a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// User-facing category of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The video device is used by another application
    VideoOutputBusy,
    /// Any other failure inside the shared video sink
    VideoOutputProblem,
    /// The audio device is used by another application
    AudioOutputBusy,
    /// Any other failure inside the shared audio sink
    AudioOutputProblem,
    /// Not raised by a shared sink; message passed through as is
    Unclassified,
}

/// A problem report ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub severity: Severity,
    pub category: ErrorCategory,
    /// Headline
    pub reason: String,
    /// Longer explanation
    pub detail: String,
    /// Graph the report came from
    pub graph: GraphId,
    /// Element that raised it
    pub origin: ElementPath,
}

/// Notification published by the playground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum Notification {
    /// A new graph now drives the shared outputs
    CurrentChanged(GraphInfo),
    /// The current graph settled in a new state
    CurrentState(State),
    GraphAdded(GraphInfo),
    GraphRemoved(GraphInfo),
    Error(ClassifiedError),
    /// The current graph reached the end of its stream
    EndOfStream(GraphInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_format() {
        let json = serde_json::to_value(Notification::CurrentState(State::Paused)).unwrap();
        assert_eq!(json["type"], "current_state");
        assert_eq!(json["data"], "paused");
    }

    #[test]
    fn test_graph_info_round_trip() {
        let info = GraphInfo {
            id: GraphId::from(7),
            kind: GraphKind::Source { uri: "file:///clip.ogv".into() },
            has_video: true,
            has_audio: false,
        };
        let json = serde_json::to_string(&Notification::GraphAdded(info.clone())).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Notification::GraphAdded(info));
    }
}

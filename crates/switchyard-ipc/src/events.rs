//! IPC event types (server to client).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_core::Notification;

/// Event sent from daemon to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub event: EventType,
    /// Event data
    pub data: Value,
}

/// Types of events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Another graph drives the shared outputs
    CurrentChanged,
    /// The current graph settled in a new state
    CurrentState,
    /// Graph registered
    GraphAdded,
    /// Graph unregistered
    GraphRemoved,
    /// Classified error or warning
    Error,
    /// The current graph reached the end of its stream
    EndOfStream,
}

impl EventType {
    /// Type of event carrying `notification`.
    #[must_use]
    pub fn of(notification: &Notification) -> Self {
        match notification {
            Notification::CurrentChanged(_) => Self::CurrentChanged,
            Notification::CurrentState(_) => Self::CurrentState,
            Notification::GraphAdded(_) => Self::GraphAdded,
            Notification::GraphRemoved(_) => Self::GraphRemoved,
            Notification::Error(_) => Self::Error,
            Notification::EndOfStream(_) => Self::EndOfStream,
        }
    }
}

impl From<&Notification> for Event {
    fn from(notification: &Notification) -> Self {
        let data = match notification {
            Notification::CurrentChanged(info)
            | Notification::GraphAdded(info)
            | Notification::GraphRemoved(info)
            | Notification::EndOfStream(info) => serde_json::to_value(info),
            Notification::CurrentState(state) => serde_json::to_value(state),
            Notification::Error(report) => serde_json::to_value(report),
        };
        Self { event: EventType::of(notification), data: data.unwrap_or_default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_core::{
        ClassifiedError, ElementPath, ErrorCategory, GraphId, GraphInfo, GraphKind, Severity, State,
    };

    #[test]
    fn test_state_event() {
        let event = Event::from(&Notification::CurrentState(State::Playing));
        assert_eq!(event.event, EventType::CurrentState);
        assert_eq!(event.data, json!("playing"));
    }

    #[test]
    fn test_graph_event_carries_info() {
        let info = GraphInfo {
            id: GraphId::from(4),
            kind: GraphKind::Timeline,
            has_video: true,
            has_audio: true,
        };
        let event = Event::from(&Notification::CurrentChanged(info));

        assert_eq!(event.event, EventType::CurrentChanged);
        assert_eq!(event.data["id"], 4);
        assert_eq!(event.data["kind"]["type"], "timeline");
    }

    #[test]
    fn test_error_event() {
        let report = ClassifiedError {
            severity: Severity::Error,
            category: ErrorCategory::AudioOutputBusy,
            reason: "Audio output device is busy".into(),
            detail: "Please check that your audio output device isn't already used by another \
                     application"
                .into(),
            graph: GraphId::from(2),
            origin: ElementPath::parse("audio-out/alsasink0"),
        };
        let event = Event::from(&Notification::Error(report));

        assert_eq!(event.event, EventType::Error);
        assert_eq!(event.data["category"], "audio_output_busy");
        assert_eq!(event.data["severity"], "error");
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(serde_json::to_value(EventType::EndOfStream).unwrap(), json!("end_of_stream"));
        let parsed: Vec<EventType> = serde_json::from_str(r#"["graph_added","error"]"#).unwrap();
        assert_eq!(parsed, vec![EventType::GraphAdded, EventType::Error]);
    }
}

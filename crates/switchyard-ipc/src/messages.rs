//! IPC message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_core::{GraphId, SeekFormat};

use crate::events::EventType;

/// Request envelope sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for matching responses
    pub id: u64,
    /// The method to invoke
    pub method: Method,
}

/// Response envelope sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this is responding to
    pub id: u64,
    /// Result of the request
    pub result: Result<Value, ErrorInfo>,
}

impl Response {
    /// Successful response carrying `value`.
    #[must_use]
    pub fn ok(id: u64, value: Value) -> Self {
        Self { id, result: Ok(value) }
    }

    /// Failed response.
    #[must_use]
    pub fn err(id: u64, error: ErrorInfo) -> Self {
        Self { id, result: Err(error) }
    }
}

/// Error information in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// The request named a graph the daemon doesn't know.
    pub const UNKNOWN_GRAPH: i32 = 404;
    /// The playground refused the operation.
    pub const OPERATION_FAILED: i32 = 500;
    /// The operation isn't implemented.
    pub const UNSUPPORTED: i32 = 501;
    /// The daemon is shutting down.
    pub const SHUTTING_DOWN: i32 = 503;

    /// Create a new error.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Methods that can be invoked via IPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    // State queries
    /// Get the current playground snapshot
    GetState,
    /// Get every registered graph
    ListGraphs,

    // Output switching
    /// Hand the shared outputs to a registered graph
    SwitchTo { graph: GraphId },
    /// Hand the shared outputs back to the idle graph
    SwitchToDefault,
    /// Remove a graph from the playground
    Unregister { graph: GraphId },

    // Transport
    /// Play the current graph
    Play,
    /// Pause the current graph
    Pause,
    /// Flushing seek in the current graph
    Seek {
        position: i64,
        #[serde(default)]
        format: SeekFormat,
    },
    /// Play a single source in a throwaway graph
    Preview { uri: String },

    // Subscriptions
    /// Subscribe to event types
    Subscribe { events: Vec<EventType> },
    /// Unsubscribe from event types
    Unsubscribe { events: Vec<EventType> },

    // System
    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_wire_format() {
        let request = Request { id: 7, method: Method::SwitchTo { graph: GraphId::from(3) } };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"id": 7, "method": {"type": "SwitchTo", "params": {"graph": 3}}}));

        let unit: Request = serde_json::from_str(r#"{"id":1,"method":{"type":"Play"}}"#).unwrap();
        assert_eq!(unit.method, Method::Play);
    }

    #[test]
    fn test_seek_format_defaults_to_time() {
        let json = r#"{"id":2,"method":{"type":"Seek","params":{"position":5000}}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.method,
            Method::Seek {
                position: 5000,
                format: SeekFormat::Time
            }
        );
    }

    #[test]
    fn test_response_result_encoding() {
        let ok = serde_json::to_value(Response::ok(1, json!({"ok": true}))).unwrap();
        assert_eq!(ok, json!({"id": 1, "result": {"Ok": {"ok": true}}}));

        let info = ErrorInfo::new(ErrorInfo::UNKNOWN_GRAPH, "Graph not registered: graph-9");
        let encoded = serde_json::to_string(&Response::err(2, info)).unwrap();
        let decoded: Response = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.result.unwrap_err().code, 404);
    }
}

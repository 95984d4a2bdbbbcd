//! Events emitted by media graphs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::StateChange;

/// Location of an element inside a graph, outermost bin first.
///
/// The empty path designates the graph itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementPath(Vec<String>);

impl ElementPath {
    /// The graph itself.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a `/`-separated path such as `video-out/xvimagesink0`.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Whether this path designates the graph itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether an element named `ancestor` is this element or one of its parents.
    #[must_use]
    pub fn descends_from(&self, ancestor: &str) -> bool {
        self.0.iter().any(|segment| segment == ancestor)
    }

    /// Path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        f.write_str(&self.0.join("/"))
    }
}

/// Error domain, mirroring the media engine's error quarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDomain {
    Core,
    Library,
    Resource,
    Stream,
}

/// Resource error codes.
pub mod resource {
    pub const FAILED: i32 = 1;
    pub const TOO_LAZY: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const BUSY: i32 = 4;
    pub const OPEN_READ: i32 = 5;
    pub const OPEN_WRITE: i32 = 6;
    pub const OPEN_READ_WRITE: i32 = 7;
    pub const CLOSE: i32 = 8;
    pub const READ: i32 = 9;
    pub const WRITE: i32 = 10;
    pub const SEEK: i32 = 11;
    pub const SYNC: i32 = 12;
    pub const SETTINGS: i32 = 13;
    pub const NO_SPACE_LEFT: i32 = 14;
    pub const NOT_AUTHORIZED: i32 = 15;
}

/// Error or warning payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphError {
    pub domain: ErrorDomain,
    pub code: i32,
    /// Short human-readable message
    pub message: String,
    /// Debug detail, may be empty
    pub detail: String,
}

impl GraphError {
    /// Create an error payload.
    #[must_use]
    pub fn new(
        domain: ErrorDomain,
        code: i32,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Whether this reports a device already in use.
    #[must_use]
    pub fn is_resource_busy(&self) -> bool {
        self.domain == ErrorDomain::Resource && self.code == resource::BUSY
    }
}

/// Kind-specific content of a graph event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum GraphMessage {
    StateChanged(StateChange),
    Error(GraphError),
    Warning(GraphError),
    EndOfStream,
}

/// An event emitted by a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Element that posted the event
    pub origin: ElementPath,
    pub message: GraphMessage,
}

impl GraphEvent {
    /// Event posted by the graph itself.
    #[must_use]
    pub fn from_root(message: GraphMessage) -> Self {
        Self { origin: ElementPath::root(), message }
    }

    /// Event posted by an element inside the graph.
    #[must_use]
    pub fn from_element(origin: ElementPath, message: GraphMessage) -> Self {
        Self { origin, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_path() {
        let path = ElementPath::parse("video-out/convert/xvimagesink0");
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.to_string(), "video-out/convert/xvimagesink0");
        assert!(!path.is_root());

        assert!(ElementPath::parse("").is_root());
        assert!(ElementPath::parse("/").is_root());
    }

    #[test]
    fn test_descends_from() {
        let path = ElementPath::parse("video-out/xvimagesink0");
        assert!(path.descends_from("video-out"));
        assert!(path.descends_from("xvimagesink0"));
        assert!(!path.descends_from("audio-out"));
        assert!(!ElementPath::root().descends_from("video-out"));
    }

    #[test]
    fn test_resource_busy() {
        let busy = GraphError::new(ErrorDomain::Resource, resource::BUSY, "Device busy", "");
        assert!(busy.is_resource_busy());

        let not_found = GraphError::new(ErrorDomain::Resource, resource::NOT_FOUND, "Missing", "");
        assert!(!not_found.is_resource_busy());

        let stream = GraphError::new(ErrorDomain::Stream, resource::BUSY, "Decode", "");
        assert!(!stream.is_resource_busy());
    }
}

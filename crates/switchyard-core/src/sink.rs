//! Shared output sinks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::event::ElementPath;

/// Output medium of a shared sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Video,
    Audio,
}

impl Medium {
    /// Both media, video first.
    pub const ALL: [Self; 2] = [Self::Video, Self::Audio];
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// An output-capable sub-graph lent to one graph at a time.
pub trait SharedSink: Send + Sync {
    /// Element name of the sink bin inside whichever graph holds it.
    fn name(&self) -> &str;

    /// Medium this sink renders.
    fn medium(&self) -> Medium;

    /// Whether `element` is the sink itself or one of its descendants.
    fn contains(&self, element: &ElementPath) -> bool {
        element.descends_from(self.name())
    }
}

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn SharedSink>;

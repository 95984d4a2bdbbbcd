//! The controllable media graph interface.
//!
//! A graph is an independently scheduled processing pipeline owned by
//! someone else. Switchyard only commands its lifecycle, lends it the shared
//! output sinks and listens to the events it emits.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::event::GraphEvent;
use crate::seek::SeekRequest;
use crate::sink::{Medium, SinkRef};
use crate::state::{State, StateChangeError, StateChangeSuccess};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(u64);

impl GraphId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for GraphId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph-{}", self.0)
    }
}

/// What a graph was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum GraphKind {
    /// The always-present idle graph (black frames, silence)
    Idle,
    /// Plays a single source, e.g. a clip previewed from the library
    Source { uri: String },
    /// Renders an edit timeline
    Timeline,
    /// Anything else a host application builds
    Custom(String),
}

/// Handle returned by [`MediaGraph::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked for every event a graph emits.
///
/// Handlers run on the graph's own threads and must not block.
pub type EventHandler = Arc<dyn Fn(&GraphEvent) + Send + Sync>;

/// A controllable media graph.
pub trait MediaGraph: Send + Sync {
    /// Identity used for membership and equality checks.
    fn id(&self) -> GraphId;

    /// What this graph was built for.
    fn kind(&self) -> GraphKind;

    /// Whether the graph produces video.
    fn has_video(&self) -> bool;

    /// Whether the graph produces audio.
    fn has_audio(&self) -> bool;

    /// Whether the graph produces the given medium.
    fn has_medium(&self, medium: Medium) -> bool {
        match medium {
            Medium::Video => self.has_video(),
            Medium::Audio => self.has_audio(),
        }
    }

    /// Last state the graph reached.
    fn state(&self) -> State;

    /// Request a lifecycle transition.
    ///
    /// Returns as soon as the graph has accepted or rejected the request;
    /// completion of asynchronous transitions is reported as an event.
    fn set_state(&self, state: State) -> Result<StateChangeSuccess, StateChangeError>;

    /// Plug a shared sink into the graph. Returns `false` if refused.
    fn attach_sink(&self, sink: &SinkRef) -> bool;

    /// Unplug the shared sink of the given medium. Returns `true` if one was attached.
    fn detach_sink(&self, medium: Medium) -> bool;

    /// Perform a seek. Returns `false` if the graph rejected it.
    fn seek(&self, request: &SeekRequest) -> bool;

    /// Register an event handler.
    fn subscribe(&self, handler: EventHandler) -> SubscriptionId;

    /// Remove an event handler. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Shared handle to a graph.
pub type GraphRef = Arc<dyn MediaGraph>;

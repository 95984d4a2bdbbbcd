//! Error types for Switchyard core.

use thiserror::Error;

use crate::graph::GraphId;
use crate::sink::Medium;
use crate::state::State;

/// Core error type for Switchyard operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Graph not registered: {0}")]
    NotRegistered(GraphId),

    #[error("Graph already registered: {0}")]
    AlreadyRegistered(GraphId),

    #[error("Graph {0} cannot be registered (idle graphs belong to the playground)")]
    UnrecognizedGraph(GraphId),

    #[error("Graph {graph} refused transition to {state}")]
    StateChange { graph: GraphId, state: State },

    #[error("Graph {graph} refused the {medium} sink")]
    SinkAttach { graph: GraphId, medium: Medium },

    #[error("No current graph")]
    NoCurrentGraph,

    #[error("Output sinks not configured (video: {video}, audio: {audio})")]
    SinksNotConfigured { video: bool, audio: bool },

    #[error("Seek rejected by graph {0}")]
    SeekRejected(GraphId),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Graph construction failed: {0}")]
    Build(String),
}

/// Result type alias for Switchyard core operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Commands for playground mutations.
//!
//! Controllers never touch the playground directly. They send commands to
//! the single task that owns it, which executes them one at a time.

use crate::graph::GraphId;
use crate::seek::SeekFormat;

/// A command representing a playground mutation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Hand the shared outputs to a registered graph
    SwitchTo { graph: GraphId },
    /// Hand the shared outputs back to the idle graph
    SwitchToDefault,
    /// Remove a graph from the playground
    Unregister { graph: GraphId },
    /// Play the current graph
    Play,
    /// Pause the current graph
    Pause,
    /// Seek in the current graph
    Seek { position: i64, format: SeekFormat },
    /// Preview a single source in a throwaway graph
    Preview { uri: String },
    /// Drive every graph to NULL and stop
    Shutdown,
}

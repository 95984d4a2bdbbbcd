//! Switchyard Engine - Output arbitration between media graphs.
//!
//! This crate decides which graph drives the shared outputs:
//! - Tracking registered graphs and the idle default graph
//! - Switching the output owner and lending it the shared sinks
//! - Routing graph events into a single notification stream
//! - Turning sink errors into user-facing reports

pub mod classify;
pub mod playground;
pub mod router;
pub mod sim;

pub use classify::classify;
pub use playground::Playground;
pub use router::Routed;
pub use sim::{SimCall, SimGraph, SimSink};

//! Switchyard Core - Shared vocabulary for output arbitration.
//!
//! This crate contains the types every other Switchyard crate speaks:
//! lifecycle states, the interfaces of controllable media graphs and shared
//! output sinks, the events graphs emit, and the notifications published to
//! controllers.

pub mod command;
pub mod error;
pub mod event;
pub mod graph;
pub mod notification;
pub mod seek;
pub mod sink;
pub mod state;

pub use command::Command;
pub use error::{Error, Result};
pub use event::{ElementPath, ErrorDomain, GraphError, GraphEvent, GraphMessage};
pub use graph::{EventHandler, GraphId, GraphKind, GraphRef, MediaGraph, SubscriptionId};
pub use notification::{ClassifiedError, ErrorCategory, GraphInfo, Notification, Severity};
pub use seek::{SeekFlags, SeekFormat, SeekRequest, SeekType};
pub use sink::{Medium, SharedSink, SinkRef};
pub use state::{State, StateChange, StateChangeError, StateChangeSuccess};

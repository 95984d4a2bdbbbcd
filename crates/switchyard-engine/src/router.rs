//! Event routing from graphs to the playground.
//!
//! Graph event handlers run on the graphs' own threads. They never touch the
//! playground: they wrap the event in a [`Routed`] envelope and push it into
//! a queue that the playground's owner drains on its own thread.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use switchyard_core::{EventHandler, GraphEvent, GraphId, GraphMessage, GraphRef, SubscriptionId};

/// Which subscription delivered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relay {
    /// Registry-wide subscription, one per known graph
    Bus,
    /// Settled state changes of the output owner
    OwnerState { tenure: u64 },
    /// End-of-stream of the output owner
    OwnerEos { tenure: u64 },
}

/// An event waiting to be routed.
#[derive(Debug, Clone)]
pub struct Routed {
    pub(crate) graph: GraphId,
    pub(crate) relay: Relay,
    pub(crate) event: GraphEvent,
}

impl Routed {
    /// Graph that emitted the event.
    #[must_use]
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// The event itself.
    #[must_use]
    pub fn event(&self) -> &GraphEvent {
        &self.event
    }
}

/// Relays installed on the output owner for the length of its tenure.
pub(crate) struct Tenure {
    pub(crate) graph: GraphRef,
    pub(crate) number: u64,
    state_relay: SubscriptionId,
    eos_relay: SubscriptionId,
}

impl Tenure {
    /// Tear down both relays.
    pub(crate) fn end(&self) {
        self.graph.unsubscribe(self.state_relay);
        self.graph.unsubscribe(self.eos_relay);
        debug!(graph = %self.graph.id(), tenure = self.number, "Owner relays removed");
    }
}

/// Holds the event queue and the registry-wide subscriptions.
pub(crate) struct EventRouter {
    tx: mpsc::UnboundedSender<Routed>,
    rx: mpsc::UnboundedReceiver<Routed>,
    bus: HashMap<GraphId, SubscriptionId>,
    next_tenure: u64,
}

impl EventRouter {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, bus: HashMap::new(), next_tenure: 1 }
    }

    fn handler<F>(&self, graph: GraphId, relay: Relay, wanted: F) -> EventHandler
    where
        F: Fn(&GraphEvent) -> bool + Send + Sync + 'static,
    {
        let tx = self.tx.clone();
        Arc::new(move |event: &GraphEvent| {
            if wanted(event) {
                // The receiver lives as long as the playground.
                let _ = tx.send(Routed { graph, relay, event: event.clone() });
            }
        })
    }

    /// Start forwarding every event of `graph`.
    pub(crate) fn watch(&mut self, graph: &GraphRef) {
        let id = graph.id();
        let subscription = graph.subscribe(self.handler(id, Relay::Bus, |_| true));
        if let Some(stale) = self.bus.insert(id, subscription) {
            graph.unsubscribe(stale);
        }
        debug!(graph = %id, "Watching graph events");
    }

    /// Stop forwarding events of `graph`.
    pub(crate) fn unwatch(&mut self, graph: &GraphRef) {
        if let Some(subscription) = self.bus.remove(&graph.id()) {
            graph.unsubscribe(subscription);
            debug!(graph = %graph.id(), "Stopped watching graph events");
        }
    }

    /// Install the owner relays on `graph`.
    pub(crate) fn begin_tenure(&mut self, graph: GraphRef) -> Tenure {
        let number = self.next_tenure;
        self.next_tenure += 1;
        let id = graph.id();

        let state_handler = self.handler(id, Relay::OwnerState { tenure: number }, |event| {
            event.origin.is_root() && matches!(event.message, GraphMessage::StateChanged(_))
        });
        let state_relay = graph.subscribe(state_handler);
        let eos_handler = self.handler(id, Relay::OwnerEos { tenure: number }, |event| {
            matches!(event.message, GraphMessage::EndOfStream)
        });
        let eos_relay = graph.subscribe(eos_handler);

        debug!(graph = %id, tenure = number, "Owner relays installed");
        Tenure { graph, number, state_relay, eos_relay }
    }

    /// Next queued event, if any, without waiting.
    pub(crate) fn try_next(&mut self) -> Option<Routed> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next queued event.
    pub(crate) async fn next(&mut self) -> Option<Routed> {
        self.rx.recv().await
    }

    /// Number of graphs being watched.
    pub(crate) fn watched(&self) -> usize {
        self.bus.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimGraph;
    use switchyard_core::{GraphKind, State, StateChange};

    fn graph() -> Arc<SimGraph> {
        SimGraph::new(GraphKind::Timeline, true, true)
    }

    #[test]
    fn test_watch_forwards_events() {
        let mut router = EventRouter::new();
        let sim = graph();
        let graph: GraphRef = sim.clone();
        router.watch(&graph);

        sim.emit(GraphEvent::from_root(GraphMessage::EndOfStream));

        let routed = router.try_next().expect("event should be queued");
        assert_eq!(routed.graph(), graph.id());
        assert_eq!(routed.relay, Relay::Bus);
        assert!(router.try_next().is_none());
    }

    #[test]
    fn test_unwatch_stops_forwarding() {
        let mut router = EventRouter::new();
        let sim = graph();
        let graph: GraphRef = sim.clone();
        router.watch(&graph);
        router.unwatch(&graph);

        sim.emit(GraphEvent::from_root(GraphMessage::EndOfStream));
        assert!(router.try_next().is_none());
        assert_eq!(sim.subscriber_count(), 0);
        assert_eq!(router.watched(), 0);
    }

    #[test]
    fn test_watch_twice_keeps_one_subscription() {
        let mut router = EventRouter::new();
        let sim = graph();
        let graph: GraphRef = sim.clone();
        router.watch(&graph);
        router.watch(&graph);

        assert_eq!(sim.subscriber_count(), 1);
    }

    #[test]
    fn test_owner_relays_filter_events() {
        let mut router = EventRouter::new();
        let sim = graph();
        let tenure = router.begin_tenure(sim.clone());

        let change = StateChange::settled(State::Ready, State::Paused);
        sim.emit(GraphEvent::from_root(GraphMessage::StateChanged(change)));
        sim.emit(GraphEvent::from_element(
            switchyard_core::ElementPath::parse("decodebin0"),
            GraphMessage::StateChanged(change),
        ));
        sim.emit(GraphEvent::from_root(GraphMessage::EndOfStream));

        let first = router.try_next().unwrap();
        assert_eq!(first.relay, Relay::OwnerState { tenure: tenure.number });
        let second = router.try_next().unwrap();
        assert_eq!(second.relay, Relay::OwnerEos { tenure: tenure.number });
        assert!(router.try_next().is_none());

        tenure.end();
        assert_eq!(sim.subscriber_count(), 0);
    }
}

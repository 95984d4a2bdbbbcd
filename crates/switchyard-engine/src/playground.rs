//! The playground: every graph of the application, one output owner.
//!
//! Graphs can run concurrently (one may be encoding in the background while
//! another is previewed) but only one of them, the current graph, drives the
//! shared video and audio sinks at any instant. The playground owns the
//! sinks and the idle default graph, and hands the sinks from graph to graph.
//!
//! All methods take `&mut self`: the owner must serialise calls, typically by
//! running the playground on a single task fed by a command queue.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use switchyard_core::{
    ElementPath, Error, GraphError, GraphId, GraphInfo, GraphKind, GraphMessage, GraphRef, Medium,
    Notification, Result, SeekFormat, SeekRequest, Severity, SinkRef, State, StateChangeSuccess,
};

use crate::classify::classify;
use crate::router::{EventRouter, Relay, Routed, Tenure};

/// Capacity of the notification channel.
const NOTIFICATION_CAPACITY: usize = 256;

/// Arbitrates the shared outputs between registered graphs.
pub struct Playground {
    /// Idle graph used when nothing else owns the outputs
    default: GraphRef,
    /// Registered graphs, in registration order
    graphs: Vec<GraphRef>,
    /// Current output owner and its relays
    current: Option<Tenure>,
    /// Graph created by the last preview
    transient: Option<GraphRef>,
    video_sink: Option<SinkRef>,
    audio_sink: Option<SinkRef>,
    /// Last state requested for whichever graph is current
    target_state: State,
    /// Whether previews start playing once prerolled
    preview_autoplay: bool,
    router: EventRouter,
    /// `None` once shut down
    notify_tx: Option<broadcast::Sender<Notification>>,
}

impl Playground {
    /// Create a playground around its idle default graph.
    ///
    /// The default graph becomes the output owner and is brought to READY.
    /// Failures are logged: the playground stays usable without an owner.
    #[must_use]
    pub fn new(default: GraphRef) -> Self {
        info!(graph = %default.id(), "Starting up playground");
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let mut playground = Self {
            default: default.clone(),
            graphs: Vec::new(),
            current: None,
            transient: None,
            video_sink: None,
            audio_sink: None,
            target_state: State::Ready,
            preview_autoplay: true,
            router: EventRouter::new(),
            notify_tx: Some(notify_tx),
        };

        playground.router.watch(&default);
        match playground.switch_to_default() {
            Ok(()) => {
                if default.set_state(playground.target_state).is_err() {
                    warn!(graph = %default.id(), "Couldn't set default graph to READY");
                }
            }
            Err(e) => warn!(error = %e, "Couldn't switch to the default graph"),
        }

        playground
    }

    /// Listen to playground notifications.
    ///
    /// After [`Self::shutdown`] the returned receiver is already closed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        match &self.notify_tx {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(tx) = &self.notify_tx {
            // No listeners is fine.
            let _ = tx.send(notification);
        }
    }

    // Registry

    /// Add a graph to the playground.
    ///
    /// # Errors
    /// Fails for idle graphs (the playground has its own) and for graphs
    /// that are already known.
    pub fn register(&mut self, graph: GraphRef) -> Result<()> {
        let id = graph.id();
        debug!(graph = %id, kind = ?graph.kind(), "Registering graph");

        if graph.kind() == GraphKind::Idle {
            return Err(Error::UnrecognizedGraph(id));
        }
        if self.is_default(id) || self.is_registered(id) {
            return Err(Error::AlreadyRegistered(id));
        }

        self.router.watch(&graph);
        let info = GraphInfo::of(graph.as_ref());
        self.graphs.push(graph);
        info!(graph = %id, count = self.graphs.len(), "Graph added");
        self.notify(Notification::GraphAdded(info));
        Ok(())
    }

    /// Remove a graph from the playground and drive it to NULL.
    ///
    /// Unknown graphs are a successful no-op. If the graph is the current
    /// owner the outputs fall back to the default graph first.
    ///
    /// # Errors
    /// Fails if the graph refuses NULL or the fallback switch fails; the
    /// graph then stays registered.
    pub fn unregister(&mut self, graph: &GraphRef) -> Result<()> {
        let id = graph.id();
        if !self.is_registered(id) {
            return Ok(());
        }
        debug!(graph = %id, "Unregistering graph");

        self.router.unwatch(graph);

        if graph.set_state(State::Null).is_err() {
            warn!(graph = %id, "Graph refused NULL, keeping it registered");
            self.router.watch(graph);
            return Err(Error::StateChange { graph: id, state: State::Null });
        }

        if self.current_id() == Some(id) {
            let default = self.default.clone();
            if let Err(e) = self.switch_inner(&default, State::Null) {
                warn!(
                    graph = %id,
                    error = %e,
                    "Fallback to default failed, keeping graph registered"
                );
                self.router.watch(graph);
                return Err(e);
            }
        }

        self.graphs.retain(|g| g.id() != id);
        if self.transient.as_ref().is_some_and(|t| t.id() == id) {
            self.transient = None;
        }
        info!(graph = %id, count = self.graphs.len(), "Graph removed");
        self.notify(Notification::GraphRemoved(GraphInfo::of(graph.as_ref())));
        Ok(())
    }

    // Output switch

    /// Make `target` the output owner.
    ///
    /// Switching to the current graph, or to a graph that is neither
    /// registered nor the default, succeeds without doing anything.
    ///
    /// # Errors
    /// Fails if `target` refuses a sink or refuses to preroll. The previous
    /// owner has been released by then, `target` gets no sink, and the
    /// playground has no owner until the next successful switch.
    pub fn switch_to(&mut self, target: &GraphRef) -> Result<()> {
        self.switch_inner(target, State::Ready)
    }

    /// Hand the outputs back to the default graph.
    ///
    /// # Errors
    /// See [`Self::switch_to`].
    pub fn switch_to_default(&mut self) -> Result<()> {
        debug!("Switching to default");
        let default = self.default.clone();
        self.switch_to(&default)
    }

    /// Switch protocol; the outgoing owner is parked in `park`.
    fn switch_inner(&mut self, target: &GraphRef, park: State) -> Result<()> {
        let id = target.id();
        if self.current_id() == Some(id) {
            return Ok(());
        }
        if !self.is_default(id) && !self.is_registered(id) {
            warn!(graph = %id, "Switch target is not in the playground, ignoring");
            return Ok(());
        }

        if let Some(tenure) = self.current.take() {
            self.release(&tenure, park);
        }

        for medium in Medium::ALL {
            let Some(sink) = self.sink(medium) else {
                continue;
            };
            if target.has_medium(medium) && !target.attach_sink(sink) {
                warn!(graph = %id, %medium, "Graph refused the shared sink, no current graph");
                Self::detach_all(target);
                return Err(Error::SinkAttach { graph: id, medium });
            }
        }

        // Relays go in before the preroll so its completion is reported.
        let tenure = self.router.begin_tenure(target.clone());
        if !self.is_default(id) {
            debug!(graph = %id, "Setting the new graph to PAUSED so it prerolls");
            if target.set_state(State::Paused).is_err() {
                warn!(graph = %id, "Graph failed to preroll, no current graph");
                tenure.end();
                Self::detach_all(target);
                return Err(Error::StateChange { graph: id, state: State::Paused });
            }
        }

        self.current = Some(tenure);
        info!(graph = %id, "Current graph changed");
        self.notify(Notification::CurrentChanged(GraphInfo::of(target.as_ref())));
        Ok(())
    }

    /// Take the shared sinks and owner relays away from the outgoing owner.
    fn release(&mut self, tenure: &Tenure, park: State) {
        let graph = &tenure.graph;
        debug!(graph = %graph.id(), state = %park, "Releasing current graph");

        if graph.set_state(park).is_err() {
            warn!(graph = %graph.id(), state = %park, "Outgoing graph refused to stop");
        }
        Self::detach_all(graph);
        tenure.end();

        if self.transient.as_ref().is_some_and(|t| t.id() == graph.id()) {
            self.transient = None;
        }
    }

    fn detach_all(graph: &GraphRef) {
        for medium in Medium::ALL {
            if graph.detach_sink(medium) {
                debug!(graph = %graph.id(), %medium, "Shared sink detached");
            }
        }
    }

    // Shared sinks

    /// Install (or remove, with `None`) the shared video sink.
    ///
    /// # Errors
    /// Fails if the current graph refuses the new sink.
    pub fn set_video_sink(&mut self, sink: Option<SinkRef>) -> Result<()> {
        self.set_sink(Medium::Video, sink)
    }

    /// Install (or remove, with `None`) the shared audio sink.
    ///
    /// # Errors
    /// Fails if the current graph refuses the new sink.
    pub fn set_audio_sink(&mut self, sink: Option<SinkRef>) -> Result<()> {
        self.set_sink(Medium::Audio, sink)
    }

    fn set_sink(&mut self, medium: Medium, sink: Option<SinkRef>) -> Result<()> {
        debug!(%medium, sink = ?sink.as_ref().map(|s| s.name().to_string()), "Setting shared sink");
        debug_assert!(sink.as_ref().is_none_or(|s| s.medium() == medium));

        let current = self.current_graph().filter(|g| g.has_medium(medium)).cloned();

        if let Some(graph) = &current
            && self.sink(medium).is_some()
        {
            if graph.set_state(State::Ready).is_err() {
                warn!(graph = %graph.id(), "Current graph refused READY before sink swap");
            }
            graph.detach_sink(medium);
        }

        *self.sink_slot(medium) = sink;

        if let (Some(graph), Some(sink)) = (&current, self.sink(medium))
            && !graph.attach_sink(sink)
        {
            warn!(graph = %graph.id(), %medium, "Current graph refused the new sink");
            return Err(Error::SinkAttach { graph: graph.id(), medium });
        }
        Ok(())
    }

    fn sink_slot(&mut self, medium: Medium) -> &mut Option<SinkRef> {
        match medium {
            Medium::Video => &mut self.video_sink,
            Medium::Audio => &mut self.audio_sink,
        }
    }

    // Preview

    /// Enable or disable playing previews right after they preroll.
    pub fn set_preview_autoplay(&mut self, enabled: bool) {
        self.preview_autoplay = enabled;
    }

    /// Play `uri` in a throwaway graph built by `build`.
    ///
    /// The previous preview graph, if any, is discarded. Nothing happens if
    /// the current graph already plays `uri`.
    ///
    /// # Errors
    /// Fails at the first failing step. If the new graph can't take over
    /// the outputs it is unregistered again and the previous preview graph
    /// stays the one to discard next time.
    pub fn preview_once<F>(&mut self, uri: &str, build: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<GraphRef>,
    {
        debug!(uri, "Preview requested");
        let wanted = GraphKind::Source { uri: uri.to_string() };
        if self.current_graph().is_some_and(|g| g.kind() == wanted) {
            info!(uri, "Already previewing");
            return Ok(());
        }

        self.pause()?;
        let graph = build(uri)?;
        self.register(graph.clone())?;

        // The switch clears the slot when it releases the previous preview.
        let previous = self.transient.clone();
        if let Err(e) = self.switch_to(&graph) {
            if let Some(previous) = previous
                && self.is_registered(previous.id())
            {
                self.transient = Some(previous);
            }
            if let Err(cleanup) = self.unregister(&graph) {
                warn!(
                    graph = %graph.id(),
                    error = %cleanup,
                    "Couldn't discard failed preview graph"
                );
            }
            return Err(e);
        }
        if let Some(previous) = previous {
            debug!(graph = %previous.id(), "Discarding previous preview graph");
            self.unregister(&previous)?;
        }
        self.transient = Some(graph);

        if self.preview_autoplay {
            self.play()?;
        }
        info!(uri, "Preview started");
        Ok(())
    }

    // Transport

    /// Set the current graph to PLAYING.
    ///
    /// # Errors
    /// Fails if there is no current graph, a shared sink is missing, or the
    /// graph refuses the transition.
    pub fn play(&mut self) -> Result<StateChangeSuccess> {
        debug!("play");
        let graph = self.current_graph().cloned().ok_or(Error::NoCurrentGraph)?;
        if self.video_sink.is_none() || self.audio_sink.is_none() {
            warn!("Cannot play without both shared sinks");
            return Err(Error::SinksNotConfigured {
                video: self.video_sink.is_some(),
                audio: self.audio_sink.is_some(),
            });
        }

        self.target_state = State::Playing;
        let result = graph
            .set_state(State::Playing)
            .map_err(|_| Error::StateChange { graph: graph.id(), state: State::Playing });
        debug!(?result, "change state returned");
        result
    }

    /// Set the current graph to PAUSED.
    ///
    /// Pausing with no current graph, or with the default graph current,
    /// succeeds without doing anything.
    ///
    /// # Errors
    /// Fails if the graph refuses the transition.
    pub fn pause(&mut self) -> Result<StateChangeSuccess> {
        debug!("pause");
        let Some(graph) = self.current_graph().cloned() else {
            return Ok(StateChangeSuccess::Success);
        };
        if self.is_default(graph.id()) {
            return Ok(StateChangeSuccess::Success);
        }

        self.target_state = State::Paused;
        graph
            .set_state(State::Paused)
            .map_err(|_| Error::StateChange { graph: graph.id(), state: State::Paused })
    }

    /// Flushing seek to `position` in the current graph.
    ///
    /// # Errors
    /// Fails if there is no current graph or the seek is rejected.
    pub fn seek_current(&mut self, position: i64, format: SeekFormat) -> Result<()> {
        debug!(position, ?format, "Seeking in current graph");
        let graph = self.current_graph().ok_or(Error::NoCurrentGraph)?;

        if !graph.seek(&SeekRequest::flush_to(position, format)) {
            warn!(graph = %graph.id(), position, "Seeking in current graph failed");
            return Err(Error::SeekRejected(graph.id()));
        }
        debug!(position, "Seek succeeded");
        Ok(())
    }

    /// Fast-forward the current graph.
    ///
    /// # Errors
    /// Not supported yet.
    pub fn fast_forward(&mut self) -> Result<()> {
        Err(Error::Unsupported("fast-forward"))
    }

    /// Play the current graph backwards.
    ///
    /// # Errors
    /// Not supported yet.
    pub fn rewind(&mut self) -> Result<()> {
        Err(Error::Unsupported("rewind"))
    }

    /// Advance the current graph by one video frame.
    ///
    /// # Errors
    /// Not supported yet.
    pub fn step_forward(&mut self) -> Result<()> {
        Err(Error::Unsupported("step forward"))
    }

    /// Move the current graph back by one video frame.
    ///
    /// # Errors
    /// Not supported yet.
    pub fn step_backward(&mut self) -> Result<()> {
        Err(Error::Unsupported("step backward"))
    }

    /// Drive every graph, the default one included, to NULL.
    ///
    /// Event subscriptions are dropped and notification listeners see the
    /// channel close.
    pub fn shutdown(&mut self) {
        info!(count = self.graphs.len(), "Shutting down playground");

        if let Some(tenure) = self.current.take() {
            tenure.end();
        }
        for graph in &self.graphs {
            debug!(graph = %graph.id(), "Setting graph to NULL");
            if graph.set_state(State::Null).is_err() {
                warn!(graph = %graph.id(), "Graph refused NULL during shutdown");
            }
            self.router.unwatch(graph);
        }
        debug!("Setting default graph to NULL");
        if self.default.set_state(State::Null).is_err() {
            warn!("Default graph refused NULL during shutdown");
        }
        self.router.unwatch(&self.default);

        self.notify_tx = None;
    }

    // Event routing

    /// Route every queued graph event. Returns how many were handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(routed) = self.router.try_next() {
            self.route(routed);
            handled += 1;
        }
        handled
    }

    /// Wait for the next graph event; pass it to [`Self::route`].
    pub async fn next_routed(&mut self) -> Option<Routed> {
        self.router.next().await
    }

    /// Turn one graph event into notifications.
    pub fn route(&mut self, routed: Routed) {
        let Routed { graph, relay, event } = routed;

        match relay {
            Relay::OwnerState { tenure } => {
                if !self.is_tenure(tenure) {
                    debug!(%graph, tenure, "Dropping state change from a previous owner");
                    return;
                }
                if let GraphMessage::StateChanged(change) = event.message
                    && change.is_settled()
                {
                    debug!(%graph, state = %change.new, "Current graph settled");
                    self.notify(Notification::CurrentState(change.new));
                }
            }
            Relay::OwnerEos { tenure } => {
                if !self.is_tenure(tenure) {
                    debug!(%graph, tenure, "Dropping end-of-stream from a previous owner");
                    return;
                }
                if let Some(current) = self.current_graph() {
                    info!(%graph, "Current graph reached end of stream");
                    self.notify(Notification::EndOfStream(GraphInfo::of(current.as_ref())));
                }
            }
            Relay::Bus => {
                // Errors queued before a graph left the playground are still reported.
                let known = self.is_default(graph) || self.is_registered(graph);
                match event.message {
                    GraphMessage::StateChanged(_) if !known => {
                        debug!(%graph, "Dropping state change from a departed graph");
                    }
                    GraphMessage::StateChanged(change) => {
                        debug!(
                            %graph,
                            origin = %event.origin,
                            old = %change.old,
                            new = %change.new,
                            pending = ?change.pending,
                            "State changed"
                        );
                    }
                    GraphMessage::Error(error) => {
                        self.report(Severity::Error, graph, &event.origin, &error);
                    }
                    GraphMessage::Warning(error) => {
                        self.report(Severity::Warning, graph, &event.origin, &error);
                    }
                    GraphMessage::EndOfStream => {
                        debug!(%graph, "End of stream");
                    }
                }
            }
        }
    }

    fn report(&self, severity: Severity, graph: GraphId, origin: &ElementPath, error: &GraphError) {
        let report = classify(
            severity,
            graph,
            origin,
            error,
            self.video_sink.as_deref(),
            self.audio_sink.as_deref(),
        );
        self.notify(Notification::Error(report));
    }

    fn is_tenure(&self, number: u64) -> bool {
        self.current.as_ref().is_some_and(|t| t.number == number)
    }

    // Introspection

    /// The idle default graph.
    #[must_use]
    pub fn default_graph(&self) -> &GraphRef {
        &self.default
    }

    /// Registered graphs, in registration order.
    #[must_use]
    pub fn graphs(&self) -> &[GraphRef] {
        &self.graphs
    }

    /// Current output owner.
    #[must_use]
    pub fn current_graph(&self) -> Option<&GraphRef> {
        self.current.as_ref().map(|t| &t.graph)
    }

    /// Identity of the current output owner.
    #[must_use]
    pub fn current_id(&self) -> Option<GraphId> {
        self.current_graph().map(|g| g.id())
    }

    /// Graph created by the last preview, while it is around.
    #[must_use]
    pub fn transient(&self) -> Option<&GraphRef> {
        self.transient.as_ref()
    }

    /// Look up the default graph or a registered graph.
    #[must_use]
    pub fn find(&self, id: GraphId) -> Option<&GraphRef> {
        if self.is_default(id) {
            return Some(&self.default);
        }
        self.graphs.iter().find(|g| g.id() == id)
    }

    /// Whether `id` is a registered graph. The default graph is not registered.
    #[must_use]
    pub fn is_registered(&self, id: GraphId) -> bool {
        self.graphs.iter().any(|g| g.id() == id)
    }

    fn is_default(&self, id: GraphId) -> bool {
        self.default.id() == id
    }

    /// Shared sink of `medium`, if configured.
    #[must_use]
    pub fn sink(&self, medium: Medium) -> Option<&SinkRef> {
        match medium {
            Medium::Video => self.video_sink.as_ref(),
            Medium::Audio => self.audio_sink.as_ref(),
        }
    }

    /// Shared video sink, if configured.
    #[must_use]
    pub fn video_sink(&self) -> Option<&SinkRef> {
        self.video_sink.as_ref()
    }

    /// Shared audio sink, if configured.
    #[must_use]
    pub fn audio_sink(&self) -> Option<&SinkRef> {
        self.audio_sink.as_ref()
    }

    /// Last state requested through play/pause.
    #[must_use]
    pub fn target_state(&self) -> State {
        self.target_state
    }
}

impl Drop for Playground {
    fn drop(&mut self) {
        if let Some(tenure) = self.current.take() {
            tenure.end();
        }
    }
}

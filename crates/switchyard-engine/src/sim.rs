//! Simulated graphs and sinks.
//!
//! A [`SimGraph`] behaves like a media graph without processing any media:
//! it walks the state ladder, keeps track of attached sinks and emits the
//! same events a real graph would. Failures can be injected per operation.
//! The daemon uses it as its headless backend and the tests use it to drive
//! the playground.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use switchyard_core::{
    EventHandler, GraphEvent, GraphId, GraphKind, GraphMessage, MediaGraph, Medium, SeekRequest,
    SharedSink, SinkRef, State, StateChange, StateChangeError, StateChangeSuccess, SubscriptionId,
};

/// A call made on a [`SimGraph`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    SetState(State),
    Attach { medium: Medium, sink: String },
    Detach(Medium),
    Seek(i64),
}

#[derive(Default)]
struct Inner {
    state: State,
    pending: Option<State>,
    async_transitions: bool,
    failing_states: HashSet<State>,
    refused_sinks: HashSet<Medium>,
    refuse_seek: bool,
    video_sink: Option<SinkRef>,
    audio_sink: Option<SinkRef>,
    handlers: Vec<(SubscriptionId, EventHandler)>,
    next_subscription: u64,
    calls: Vec<SimCall>,
}

impl Inner {
    fn slot(&mut self, medium: Medium) -> &mut Option<SinkRef> {
        match medium {
            Medium::Video => &mut self.video_sink,
            Medium::Audio => &mut self.audio_sink,
        }
    }
}

/// A media graph that only pretends to process media.
pub struct SimGraph {
    id: GraphId,
    kind: GraphKind,
    has_video: bool,
    has_audio: bool,
    inner: Mutex<Inner>,
}

impl SimGraph {
    /// Create a graph with the given capabilities.
    #[must_use]
    pub fn new(kind: GraphKind, has_video: bool, has_audio: bool) -> Arc<Self> {
        Arc::new(Self {
            id: GraphId::next(),
            kind,
            has_video,
            has_audio,
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Create an idle graph (black frames and silence).
    #[must_use]
    pub fn idle() -> Arc<Self> {
        Self::new(GraphKind::Idle, true, true)
    }

    /// Create a graph playing a single source with video and audio.
    #[must_use]
    pub fn source(uri: &str) -> Arc<Self> {
        Self::new(GraphKind::Source { uri: uri.to_string() }, true, true)
    }

    /// Make transitions asynchronous: they stay pending until [`Self::complete_pending`].
    pub fn set_async(&self, enabled: bool) {
        self.inner.lock().async_transitions = enabled;
    }

    /// Reject every request to move to `state`.
    pub fn fail_state(&self, state: State) {
        self.inner.lock().failing_states.insert(state);
    }

    /// Accept requests to move to `state` again.
    pub fn heal_state(&self, state: State) {
        self.inner.lock().failing_states.remove(&state);
    }

    /// Refuse to attach sinks of `medium`.
    pub fn refuse_sink(&self, medium: Medium) {
        self.inner.lock().refused_sinks.insert(medium);
    }

    /// Reject seeks.
    pub fn refuse_seek(&self, refuse: bool) {
        self.inner.lock().refuse_seek = refuse;
    }

    /// Name of the sink attached for `medium`.
    #[must_use]
    pub fn attached(&self, medium: Medium) -> Option<String> {
        self.inner.lock().slot(medium).as_ref().map(|sink| sink.name().to_string())
    }

    /// State requested but not reached yet.
    #[must_use]
    pub fn pending(&self) -> Option<State> {
        self.inner.lock().pending
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<SimCall> {
        self.inner.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Number of live event subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&self, event: GraphEvent) {
        // Handlers are called without holding the lock.
        let handlers: Vec<EventHandler> =
            self.inner.lock().handlers.iter().map(|(_, h)| Arc::clone(h)).collect();
        trace!(graph = %self.id, ?event, subscribers = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Finish an asynchronous transition, emitting its state changes.
    pub fn complete_pending(&self) {
        let (from, to) = {
            let mut inner = self.inner.lock();
            let Some(target) = inner.pending.take() else {
                return;
            };
            let from = inner.state;
            inner.state = target;
            (from, target)
        };
        self.walk(from, to);
    }

    /// Emit one state-changed event per rung between `from` and `to`.
    fn walk(&self, from: State, to: State) {
        let steps = ladder(from, to);
        let mut old = from;
        for (index, new) in steps.iter().copied().enumerate() {
            let pending = if index + 1 == steps.len() { None } else { Some(to) };
            self.emit(GraphEvent::from_root(GraphMessage::StateChanged(StateChange {
                old,
                new,
                pending,
            })));
            old = new;
        }
    }
}

/// States visited when moving from `from` to `to`, excluding `from`.
fn ladder(from: State, to: State) -> Vec<State> {
    const RUNGS: [State; 4] = [State::Null, State::Ready, State::Paused, State::Playing];
    let position = |state| RUNGS.iter().position(|s| *s == state).unwrap_or(0);
    let (start, end) = (position(from), position(to));

    if start < end {
        RUNGS[start + 1..=end].to_vec()
    } else {
        RUNGS[end..start].iter().rev().copied().collect()
    }
}

impl MediaGraph for SimGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn kind(&self) -> GraphKind {
        self.kind.clone()
    }

    fn has_video(&self) -> bool {
        self.has_video
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn state(&self) -> State {
        self.inner.lock().state
    }

    fn set_state(&self, state: State) -> Result<StateChangeSuccess, StateChangeError> {
        let from = {
            let mut inner = self.inner.lock();
            inner.calls.push(SimCall::SetState(state));
            if inner.failing_states.contains(&state) {
                debug!(graph = %self.id, %state, "Simulated transition failure");
                return Err(StateChangeError);
            }
            if inner.async_transitions && inner.state != state {
                inner.pending = Some(state);
                return Ok(StateChangeSuccess::Async);
            }
            let from = inner.state;
            inner.state = state;
            inner.pending = None;
            from
        };
        self.walk(from, state);
        Ok(StateChangeSuccess::Success)
    }

    fn attach_sink(&self, sink: &SinkRef) -> bool {
        let medium = sink.medium();
        let mut inner = self.inner.lock();
        inner.calls.push(SimCall::Attach { medium, sink: sink.name().to_string() });
        if inner.refused_sinks.contains(&medium) {
            return false;
        }
        *inner.slot(medium) = Some(Arc::clone(sink));
        true
    }

    fn detach_sink(&self, medium: Medium) -> bool {
        let mut inner = self.inner.lock();
        let detached = inner.slot(medium).take().is_some();
        if detached {
            inner.calls.push(SimCall::Detach(medium));
        }
        detached
    }

    fn seek(&self, request: &SeekRequest) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(SimCall::Seek(request.start));
        !inner.refuse_seek
    }

    fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.handlers.push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().handlers.retain(|(existing, _)| *existing != id);
    }
}

/// A named shared sink.
#[derive(Debug, Clone)]
pub struct SimSink {
    name: String,
    medium: Medium,
}

impl SimSink {
    /// Create a sink handle.
    #[must_use]
    pub fn new(name: &str, medium: Medium) -> SinkRef {
        Arc::new(Self { name: name.to_string(), medium })
    }

    /// Create a video sink handle.
    #[must_use]
    pub fn video(name: &str) -> SinkRef {
        Self::new(name, Medium::Video)
    }

    /// Create an audio sink handle.
    #[must_use]
    pub fn audio(name: &str) -> SinkRef {
        Self::new(name, Medium::Audio)
    }
}

impl SharedSink for SimSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn medium(&self) -> Medium {
        self.medium
    }
}

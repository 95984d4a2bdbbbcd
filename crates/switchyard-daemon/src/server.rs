//! Request handling for the IPC server.
//!
//! Queries are answered straight from the playground. Everything that
//! mutates it becomes a [`Command`] executed by the owner loop.

use serde_json::{Value, json};
use tracing::{debug, info};

use switchyard_core::{Command, Error, GraphId, GraphInfo, GraphRef, Medium};
use switchyard_engine::{Playground, SimGraph};
use switchyard_ipc::messages::{ErrorInfo, Method};

/// What the owner loop has to do with a request.
#[derive(Debug)]
pub enum Dispatch {
    /// Answer right away
    Reply(Result<Value, ErrorInfo>),
    /// Run a command, then answer with its outcome
    Execute(Command),
}

/// Handle an IPC request.
pub fn handle_request(method: &Method, playground: &Playground) -> Dispatch {
    match method {
        Method::GetState => Dispatch::Reply(Ok(snapshot(playground))),
        Method::ListGraphs => {
            let graphs: Vec<GraphInfo> = playground
                .graphs()
                .iter()
                .map(|g| GraphInfo::of(g.as_ref()))
                .collect();
            Dispatch::Reply(Ok(serde_json::to_value(graphs).unwrap_or(json!([]))))
        }

        Method::SwitchTo { graph } => Dispatch::Execute(Command::SwitchTo { graph: *graph }),
        Method::SwitchToDefault => Dispatch::Execute(Command::SwitchToDefault),
        Method::Unregister { graph } => Dispatch::Execute(Command::Unregister { graph: *graph }),
        Method::Play => Dispatch::Execute(Command::Play),
        Method::Pause => Dispatch::Execute(Command::Pause),
        Method::Seek { position, format } => {
            Dispatch::Execute(Command::Seek { position: *position, format: *format })
        }
        Method::Preview { uri } => Dispatch::Execute(Command::Preview { uri: uri.clone() }),

        // The IPC server answers these itself; they only get here from
        // callers bypassing it.
        Method::Subscribe { events } | Method::Unsubscribe { events } => {
            debug!(?events, "Subscription request reached the daemon");
            Dispatch::Reply(Ok(json!({"success": true})))
        }

        Method::Shutdown => {
            info!("Shutdown requested via IPC");
            Dispatch::Execute(Command::Shutdown)
        }
    }
}

/// Run a playground command.
///
/// `Shutdown` is left to the owner loop, which stops after answering it.
pub fn execute(playground: &mut Playground, command: Command) -> Result<Value, ErrorInfo> {
    debug!(?command, "Executing command");
    let outcome = match command {
        Command::SwitchTo { graph } => {
            lookup(playground, graph).and_then(|g| playground.switch_to(&g))
        }
        Command::SwitchToDefault => playground.switch_to_default(),
        Command::Unregister { graph } => {
            lookup(playground, graph).and_then(|g| playground.unregister(&g))
        }
        Command::Play => playground.play().map(|_| ()),
        Command::Pause => playground.pause().map(|_| ()),
        Command::Seek { position, format } => playground.seek_current(position, format),
        Command::Preview { uri } => {
            playground.preview_once(&uri, |uri| Ok(SimGraph::source(uri) as GraphRef))
        }
        Command::Shutdown => Ok(()),
    };

    outcome.map(|()| snapshot(playground)).map_err(|e| error_info(&e))
}

fn lookup(playground: &Playground, graph: GraphId) -> switchyard_core::Result<GraphRef> {
    playground.find(graph).cloned().ok_or(Error::NotRegistered(graph))
}

/// Map an engine error onto the wire.
pub fn error_info(error: &Error) -> ErrorInfo {
    let code = match error {
        Error::NotRegistered(_) => ErrorInfo::UNKNOWN_GRAPH,
        Error::Unsupported(_) => ErrorInfo::UNSUPPORTED,
        _ => ErrorInfo::OPERATION_FAILED,
    };
    ErrorInfo::new(code, error.to_string())
}

/// Current playground state as JSON.
pub fn snapshot(playground: &Playground) -> Value {
    let sink_name = |medium| playground.sink(medium).map(|s| s.name().to_string());
    json!({
        "current": playground.current_graph().map(|g| GraphInfo::of(g.as_ref())),
        "current_state": playground.current_graph().map(|g| g.state()),
        "target_state": playground.target_state(),
        "default": playground.default_graph().id(),
        "transient": playground.transient().map(|g| g.id()),
        "graphs": playground.graphs().len(),
        "sinks": {
            "video": sink_name(Medium::Video),
            "audio": sink_name(Medium::Audio),
        },
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use switchyard_core::{GraphKind, SeekFormat, State};
    use switchyard_engine::SimSink;

    fn playground() -> Playground {
        let mut playground = Playground::new(SimGraph::idle());
        playground.set_video_sink(Some(SimSink::video("video-out"))).unwrap();
        playground.set_audio_sink(Some(SimSink::audio("audio-out"))).unwrap();
        playground
    }

    fn run(playground: &mut Playground, method: Method) -> Result<Value, ErrorInfo> {
        match handle_request(&method, playground) {
            Dispatch::Reply(result) => result,
            Dispatch::Execute(command) => execute(playground, command),
        }
    }

    #[test]
    fn test_get_state_snapshot() {
        let mut playground = playground();
        let state = run(&mut playground, Method::GetState).unwrap();

        assert_eq!(state["current"]["kind"]["type"], "idle");
        assert_eq!(state["current_state"], "ready");
        assert_eq!(state["target_state"], "ready");
        assert_eq!(state["sinks"]["video"], "video-out");
        assert_eq!(state["graphs"], 0);
        assert!(state["transient"].is_null());
    }

    #[test]
    fn test_mutations_become_commands() {
        let playground = playground();
        assert_matches!(
            handle_request(&Method::Play, &playground),
            Dispatch::Execute(Command::Play)
        );
        assert_matches!(
            handle_request(&Method::Seek { position: 10, format: SeekFormat::Time }, &playground),
            Dispatch::Execute(Command::Seek { position: 10, format: SeekFormat::Time })
        );
        assert_matches!(
            handle_request(&Method::Shutdown, &playground),
            Dispatch::Execute(Command::Shutdown)
        );
    }

    #[test]
    fn test_preview_then_list_graphs() {
        let mut playground = playground();

        let preview = Method::Preview {
            uri: "file:///clip.ogv".into(),
        };
        let state = run(&mut playground, preview).unwrap();
        assert_eq!(state["current_state"], "playing");
        assert_eq!(state["current"]["kind"]["data"]["uri"], "file:///clip.ogv");

        let graphs = run(&mut playground, Method::ListGraphs).unwrap();
        assert_eq!(graphs.as_array().map(Vec::len), Some(1));
        let kind = GraphKind::Source {
            uri: "file:///clip.ogv".into(),
        };
        assert_eq!(graphs[0]["kind"], serde_json::to_value(kind).unwrap());
    }

    #[test]
    fn test_switch_and_unregister_by_id() {
        let mut playground = playground();
        run(&mut playground, Method::Preview { uri: "file:///clip.ogv".into() }).unwrap();
        let preview = playground.transient().map(|g| g.id()).unwrap();

        run(&mut playground, Method::SwitchToDefault).unwrap();
        let state = run(&mut playground, Method::SwitchTo { graph: preview }).unwrap();
        assert_eq!(state["current"]["id"], preview.get());
        assert_eq!(playground.current_graph().map(|g| g.state()), Some(State::Paused));

        run(&mut playground, Method::Unregister { graph: preview }).unwrap();
        assert!(playground.graphs().is_empty());
    }

    #[test]
    fn test_unknown_graph_is_reported() {
        let mut playground = playground();
        let switch = Method::SwitchTo {
            graph: GraphId::from(u64::MAX),
        };
        let error = run(&mut playground, switch).unwrap_err();

        assert_eq!(error.code, ErrorInfo::UNKNOWN_GRAPH);
        assert!(error.message.contains("not registered"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_info(&Error::Unsupported("rewind")).code, ErrorInfo::UNSUPPORTED);
        assert_eq!(error_info(&Error::NoCurrentGraph).code, ErrorInfo::OPERATION_FAILED);
    }
}

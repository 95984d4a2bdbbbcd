//! Switchyard Daemon - shared output arbitration service.
//!
//! Owns the playground and runs every arbitration call on a single task:
//! IPC requests, graph events and shutdown all go through one `select!`
//! loop, so the switch protocol is never entered twice at once.

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

mod config;
mod server;
mod signals;

use switchyard_core::{Command, Notification};
use switchyard_engine::{Playground, SimGraph, SimSink};
use switchyard_ipc::{Event, IncomingRequest, IpcServer, Response, socket_path};

use crate::config::Config;
use crate::server::Dispatch;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so it can set the level
    let config = config::load_config()?;

    let level = config
        .daemon
        .log_level
        .parse::<Directive>()
        .context("Invalid daemon.log_level")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(level)
                .add_directive("switchyard_daemon=debug".parse()?)
                .add_directive("switchyard_engine=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Switchyard daemon");

    let mut playground = build_playground(&config)?;
    let mut notifications = playground.subscribe();
    info!(default = %playground.default_graph().id(), "Playground ready");

    // Start IPC server
    let socket = config.daemon.socket.clone().unwrap_or_else(socket_path);
    info!(?socket, "Starting IPC server");
    let (ipc_server, mut request_rx) = IpcServer::bind(&socket)
        .await
        .context("Failed to start IPC server")?;

    // Get event sender for broadcasting events to IPC clients
    let event_tx = ipc_server.event_sender();

    let ipc_handle = tokio::spawn(async move {
        ipc_server.run().await;
    });

    let mut shutdown_rx = signals::setup_signal_handlers()?;

    info!("Daemon running. Press Ctrl+C to exit.");

    loop {
        tokio::select! {
            // Graph events, routed on this task
            Some(routed) = playground.next_routed() => {
                playground.route(routed);
            }

            // Playground notifications, forwarded to IPC clients
            received = notifications.recv() => {
                match received {
                    Ok(notification) => forward(&event_tx, &notification),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification forwarding fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // IPC requests
            Some(IncomingRequest { client_id, request, reply }) = request_rx.recv() => {
                debug!(client_id, request_id = request.id, "Handling IPC request");

                let (result, stop) = match server::handle_request(&request.method, &playground) {
                    Dispatch::Reply(result) => (result, false),
                    Dispatch::Execute(Command::Shutdown) => {
                        (Ok(server::snapshot(&playground)), true)
                    }
                    Dispatch::Execute(command) => {
                        (server::execute(&mut playground, command), false)
                    }
                };
                if let Err(error) = &result {
                    warn!(client_id, code = error.code, message = %error.message, "Request failed");
                }
                let _ = reply.send(Response { id: request.id, result }).await;

                if stop {
                    info!("Shutdown command processed");
                    break;
                }
            }

            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    playground.shutdown();
    // Flush what was published before the channel closed
    while let Ok(notification) = notifications.try_recv() {
        forward(&event_tx, &notification);
    }
    ipc_handle.abort();
    if let Err(e) = std::fs::remove_file(&socket) {
        debug!(error = %e, "Socket already gone");
    }

    info!("Switchyard daemon stopped");
    Ok(())
}

/// Build the playground around a simulated idle graph with the configured sinks.
fn build_playground(config: &Config) -> Result<Playground> {
    let mut playground = Playground::new(SimGraph::idle());
    playground.set_preview_autoplay(config.preview.autoplay);

    if config.sinks.video {
        playground
            .set_video_sink(Some(SimSink::video(&config.sinks.video_name)))
            .context("Failed to install the video sink")?;
    }
    if config.sinks.audio {
        playground
            .set_audio_sink(Some(SimSink::audio(&config.sinks.audio_name)))
            .context("Failed to install the audio sink")?;
    }
    Ok(playground)
}

fn forward(event_tx: &broadcast::Sender<Event>, notification: &Notification) {
    debug!(?notification, "Forwarding notification");
    // No connected clients is fine.
    let _ = event_tx.send(Event::from(notification));
}

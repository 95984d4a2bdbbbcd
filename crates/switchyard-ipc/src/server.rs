//! IPC server implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::IpcResult;
use crate::events::{Event, EventType};
use crate::messages::{Method, Request, Response};

/// A request waiting for the daemon, with the channel its answer goes to.
#[derive(Debug)]
pub struct IncomingRequest {
    pub client_id: u64,
    pub request: Request,
    pub reply: mpsc::Sender<Response>,
}

/// IPC server that listens for client connections.
pub struct IpcServer {
    listener: UnixListener,
    clients: Arc<RwLock<HashMap<u64, ClientHandle>>>,
    next_client_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    request_tx: mpsc::Sender<IncomingRequest>,
}

struct ClientHandle {
    /// Empty means every event
    subscriptions: Vec<EventType>,
}

impl ClientHandle {
    fn wants(&self, event: EventType) -> bool {
        self.subscriptions.is_empty() || self.subscriptions.contains(&event)
    }
}

impl IpcServer {
    /// Create a new IPC server bound to the given socket path.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created.
    pub async fn bind(socket_path: &Path) -> IpcResult<(Self, mpsc::Receiver<IncomingRequest>)> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Remove stale socket file if it exists
        if socket_path.exists() {
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(?socket_path, "IPC server listening");

        let (event_tx, _) = broadcast::channel(256);
        let (request_tx, request_rx) = mpsc::channel(64);

        Ok((
            Self {
                listener,
                clients: Arc::new(RwLock::new(HashMap::new())),
                next_client_id: AtomicU64::new(1),
                event_tx,
                request_tx,
            },
            request_rx,
        ))
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                    info!(client_id, "Client connected");

                    let clients = Arc::clone(&self.clients);
                    let event_rx = self.event_tx.subscribe();
                    let request_tx = self.request_tx.clone();

                    tokio::spawn(async move {
                        let handled =
                            Self::handle_client(client_id, stream, clients, event_rx, request_tx);
                        if let Err(e) = handled.await {
                            error!(client_id, error = %e, "Client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                }
            }
        }
    }

    /// Broadcast an event to all subscribed clients.
    pub fn broadcast(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Get a clone of the event sender for broadcasting from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn handle_client(
        client_id: u64,
        stream: UnixStream,
        clients: Arc<RwLock<HashMap<u64, ClientHandle>>>,
        mut event_rx: broadcast::Receiver<Event>,
        request_tx: mpsc::Sender<IncomingRequest>,
    ) -> IpcResult<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        let (response_tx, mut response_rx) = mpsc::channel::<Response>(16);

        clients.write().await.insert(client_id, ClientHandle { subscriptions: Vec::new() });

        loop {
            tokio::select! {
                // Read request from client
                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => {
                            debug!(client_id, "Client disconnected");
                            break;
                        }
                        Ok(_) => {
                            match serde_json::from_str::<Request>(&line) {
                                Ok(request) => {
                                    debug!(
                                        client_id,
                                        request_id = request.id,
                                        method = ?request.method,
                                        "Received request"
                                    );
                                    if let Some(response) =
                                        Self::handle_subscription(client_id, &request, &clients)
                                            .await
                                    {
                                        let _ = response_tx.send(response).await;
                                    } else if request_tx
                                        .send(IncomingRequest {
                                            client_id,
                                            request,
                                            reply: response_tx.clone(),
                                        })
                                        .await
                                        .is_err()
                                    {
                                        warn!(client_id, "Daemon stopped taking requests");
                                        break;
                                    }
                                }
                                Err(e) => warn!(client_id, error = %e, "Invalid request format"),
                            }
                            line.clear();
                        }
                        Err(e) => {
                            error!(client_id, error = %e, "Read error");
                            break;
                        }
                    }
                }

                // Send response to client
                Some(response) = response_rx.recv() => {
                    if let Err(e) = write_line(&mut writer, &response).await {
                        error!(client_id, error = %e, "Write error");
                        break;
                    }
                }

                // Forward events to client
                received = event_rx.recv() => {
                    match received {
                        Ok(event) => {
                            let wanted = clients
                                .read()
                                .await
                                .get(&client_id)
                                .is_some_and(|h| h.wants(event.event));
                            if wanted && let Err(e) = write_line(&mut writer, &event).await {
                                error!(client_id, error = %e, "Event write error");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(client_id, skipped, "Client is too slow, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        clients.write().await.remove(&client_id);

        info!(client_id, "Client handler exiting");
        Ok(())
    }

    /// Subscriptions are per connection and answered without the daemon.
    async fn handle_subscription(
        client_id: u64,
        request: &Request,
        clients: &RwLock<HashMap<u64, ClientHandle>>,
    ) -> Option<Response> {
        let mut clients = clients.write().await;
        let handle = clients.get_mut(&client_id)?;

        match &request.method {
            Method::Subscribe { events } => {
                for event in events {
                    if !handle.subscriptions.contains(event) {
                        handle.subscriptions.push(*event);
                    }
                }
            }
            Method::Unsubscribe { events } => handle.subscriptions.retain(|e| !events.contains(e)),
            _ => return None,
        }

        debug!(client_id, subscriptions = ?handle.subscriptions, "Subscriptions updated");
        let value = serde_json::to_value(&handle.subscriptions).unwrap_or_default();
        Some(Response::ok(request.id, serde_json::json!({ "subscriptions": value })))
    }
}

async fn write_line<T: Serialize>(writer: &mut OwnedWriteHalf, message: &T) -> IpcResult<()> {
    let json = serde_json::to_string(message)? + "\n";
    writer.write_all(json.as_bytes()).await?;
    Ok(())
}

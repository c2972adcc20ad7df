//! HTTP + WebSocket server that lets a renderer drive and watch traversals

pub mod router;
pub mod handlers;
pub mod websocket;

use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use waypoint_core::{GraphResult, GraphStore};
use waypoint_traversal::{RunId, TraversalConfig, TraversalEngine};

use crate::websocket::WsMessage;

/// Unread messages a WebSocket client may fall behind by before it lags.
const BROADCAST_CAPACITY: usize = 1024;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

/// State shared by every handler and socket.
pub struct ServerState {
    pub store: GraphStore,
    pub engine: TraversalEngine,
    /// Serialized [`WsMessage`]s fanned out to every connected client.
    pub events_tx: broadcast::Sender<String>,
}

impl ServerState {
    pub fn new(store: GraphStore, traversal: TraversalConfig) -> Self {
        let (events_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let engine = TraversalEngine::new(store.clone(), traversal);
        ServerState {
            store,
            engine,
            events_tx,
        }
    }

    /// Send a raw message to every client. Returns how many received it.
    pub fn broadcast(&self, msg: String) -> usize {
        self.events_tx.send(msg).unwrap_or(0)
    }

    pub fn broadcast_message(&self, msg: &WsMessage) -> usize {
        match serde_json::to_string(msg) {
            Ok(json) => self.broadcast(json),
            Err(e) => {
                warn!("Failed to serialize broadcast message: {}", e);
                0
            }
        }
    }

    /// Start a traversal and forward its events, in order, to every client.
    pub async fn start_run(self: &Arc<Self>, start: &str, end: &str) -> GraphResult<RunId> {
        let handle = self.engine.run(start, end).await?;
        let run = handle.id();
        let (events, completion) = handle.into_parts();

        self.broadcast_message(&WsMessage::RunStarted { run });
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut tagged = Box::pin(events.tagged());
            while let Some(run_event) = tagged.next().await {
                state.broadcast_message(&WsMessage::Traversal {
                    run: run_event.run,
                    event: run_event.event,
                });
            }
            let outcome = completion.wait().await;
            debug!(%run, ?outcome, "run forwarded");
            state.broadcast_message(&WsMessage::RunEnded { run, outcome });
        });

        Ok(run)
    }

    /// Relay every store mutation to clients as a `graph_diff` message.
    pub fn spawn_diff_forwarder(self: &Arc<Self>) -> JoinHandle<()> {
        let mut diffs = self.store.subscribe();
        let state = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match diffs.recv().await {
                    Ok(diff) => {
                        state.broadcast_message(&WsMessage::GraphDiff { diff });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Diff forwarder lagged, {} diffs skipped", skipped);
                        let graph = state.store.snapshot().await;
                        state.broadcast_message(&WsMessage::FullGraph { graph });
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// The Waypoint server: REST mutations, traversal runs, and a live event socket.
pub struct WaypointServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl WaypointServer {
    pub fn new(store: GraphStore, traversal: TraversalConfig, config: ServerConfig) -> Self {
        WaypointServer {
            state: Arc::new(ServerState::new(store, traversal)),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind to the configured address and serve until shut down.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!("Waypoint server listening on {}", listener.local_addr()?);
        let _forwarder = self.state.spawn_diff_forwarder();
        let app = router::create_router(Arc::clone(&self.state));
        axum::serve(listener, app).await?;
        Ok(())
    }
}

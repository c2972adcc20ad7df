//! WebSocket handling for live traversal events and graph updates

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use waypoint_core::{GraphDiff, GraphSnapshot};
use waypoint_traversal::{RunId, RunOutcome, TraversalEvent};

use crate::ServerState;

/// WebSocket message types for client-server communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Client requests the full graph
    #[serde(rename = "request_full_graph")]
    RequestFullGraph,
    /// Server sends the full graph
    #[serde(rename = "full_graph")]
    FullGraph { graph: GraphSnapshot },
    /// Server broadcasts a graph mutation
    #[serde(rename = "graph_diff")]
    GraphDiff { diff: GraphDiff },
    /// Client asks for a traversal between two nodes
    #[serde(rename = "run_traversal")]
    RunTraversal { start: String, end: String },
    /// Server announces a run; its events follow
    #[serde(rename = "run_started")]
    RunStarted { run: RunId },
    /// One traversal event, tagged with its run
    #[serde(rename = "traversal")]
    Traversal { run: RunId, event: TraversalEvent },
    /// Server reports how a run ended, including cancelled runs
    #[serde(rename = "run_ended")]
    RunEnded { run: RunId, outcome: RunOutcome },
    /// Ping/pong for keepalive
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}

impl WsMessage {
    fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Failed to serialize WebSocket message: {}", e);
                None
            }
        }
    }
}

/// Handle WebSocket upgrade requests
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.events_tx.subscribe();
    // Replies meant for this client only.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    // Send full graph immediately after connection
    let graph = state.store.snapshot().await;
    if let Some(json_msg) = (WsMessage::FullGraph { graph }).to_json() {
        if sender.send(Message::Text(json_msg)).await.is_err() {
            warn!("Failed to send initial full graph to WebSocket client");
            return;
        }
        debug!("Sent full graph to WebSocket client");
    }

    // Spawn a task to handle incoming messages from the client
    let state_clone = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                debug!("Received WebSocket message: {}", text);

                let reply = match serde_json::from_str::<WsMessage>(&text) {
                    Ok(ws_msg) => handle_client_message(ws_msg, &state_clone).await,
                    Err(e) => {
                        warn!("Failed to parse WebSocket message: {}", e);
                        Some(WsMessage::Error {
                            message: format!("unrecognised message: {}", e),
                        })
                    }
                };
                if let Some(json) = reply.and_then(|reply| reply.to_json()) {
                    if reply_tx.send(json).is_err() {
                        break;
                    }
                }
            } else if let Message::Close(_) = msg {
                debug!("WebSocket client disconnected");
                break;
            }
        }
    });

    // Spawn a task to push broadcasts and direct replies to the client
    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
                broadcast = rx.recv() => match broadcast {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged behind by {} messages", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if sender.send(Message::Text(outgoing)).await.is_err() {
                debug!("Failed to send message to WebSocket client");
                break;
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket connection closed");
}

/// Handle a message from the client; returns a reply meant only for it.
async fn handle_client_message(msg: WsMessage, state: &Arc<ServerState>) -> Option<WsMessage> {
    match msg {
        WsMessage::RequestFullGraph => {
            debug!("Client requested full graph");
            Some(WsMessage::FullGraph {
                graph: state.store.snapshot().await,
            })
        }
        WsMessage::RunTraversal { start, end } => {
            debug!("Client requested traversal {} -> {}", start, end);
            // Success is announced to everyone via `run_started`.
            match state.start_run(&start, &end).await {
                Ok(_) => None,
                Err(e) => Some(WsMessage::Error { message: e.to_string() }),
            }
        }
        WsMessage::Ping => Some(WsMessage::Pong),
        other => {
            debug!("Ignoring server-only message from client: {:?}", other);
            None
        }
    }
}

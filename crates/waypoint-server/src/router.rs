//! Axum router setup for the Waypoint server

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{
    handlers::{
        add_edge, add_node, cancel_run, get_graph, health_check, remove_node, reset_graph,
        start_run,
    },
    websocket::ws_handler,
    ServerState,
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // WebSocket endpoint for live traversal events and graph diffs
        .route("/ws", get(ws_handler))
        // REST API endpoints
        .route("/api/health", get(health_check))
        .route("/api/graph", get(get_graph))
        .route("/api/nodes", post(add_node))
        .route("/api/nodes/:id", delete(remove_node))
        .route("/api/edges", post(add_edge))
        .route("/api/reset", post(reset_graph))
        .route("/api/runs", post(start_run).delete(cancel_run))
        // Renderers are served from elsewhere
        .layer(CorsLayer::permissive())
        .with_state(state)
}

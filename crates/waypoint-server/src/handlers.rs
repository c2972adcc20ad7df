//! REST API handlers for the Waypoint server

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waypoint_core::{EdgeChange, GraphError, GraphSnapshot};
use waypoint_traversal::RunId;

use crate::ServerState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct AddNodeRequest {
    pub id: String,
    /// Existing node to wire the new one to.
    #[serde(default)]
    pub connect_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddEdgeRequest {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Serialize)]
pub struct EdgeResponse {
    pub change: EdgeChange,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct RunStartedResponse {
    pub run: RunId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RunCancelledResponse {
    pub cancelled: Option<RunId>,
}

/// Error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// A store error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GraphError);

impl From<GraphError> for ApiError {
    fn from(e: GraphError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            GraphError::UnknownNode(_) => StatusCode::NOT_FOUND,
            GraphError::DuplicateNode(_) => StatusCode::CONFLICT,
            GraphError::InvalidId(_) => StatusCode::BAD_REQUEST,
        };
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Get the current graph as JSON
pub async fn get_graph(State(state): State<Arc<ServerState>>) -> Json<GraphSnapshot> {
    Json(state.store.snapshot().await)
}

pub async fn add_node(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<AddNodeRequest>,
) -> Result<(StatusCode, Json<GraphSnapshot>), ApiError> {
    state
        .store
        .add_node_connected(&req.id, req.connect_to.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(state.store.snapshot().await)))
}

pub async fn remove_node(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove_node(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_edge(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<AddEdgeRequest>,
) -> Result<Json<EdgeResponse>, ApiError> {
    let change = state.store.add_edge(&req.a, &req.b).await?;
    Ok(Json(EdgeResponse { change }))
}

/// Restore the default graph. Any running traversal ends as invalidated.
pub async fn reset_graph(State(state): State<Arc<ServerState>>) -> Json<GraphSnapshot> {
    state.store.reset().await;
    Json(state.store.snapshot().await)
}

/// Start a traversal; its events arrive over the WebSocket.
pub async fn start_run(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<RunRequest>,
) -> Result<(StatusCode, Json<RunStartedResponse>), ApiError> {
    let run = state.start_run(&req.start, &req.end).await?;
    let response = RunStartedResponse {
        run,
        started_at: Utc::now(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Cancel the current run, if any.
pub async fn cancel_run(State(state): State<Arc<ServerState>>) -> Json<RunCancelledResponse> {
    Json(RunCancelledResponse {
        cancelled: state.engine.cancel_active().await,
    })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(health)
}

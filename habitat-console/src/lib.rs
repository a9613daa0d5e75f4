//! HTTP boundary and seeding for the Habitat console.

pub mod seed;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use habitat_session::{HierarchySnapshot, SessionError, SessionEvent, SessionHandle, SlotKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub session: SessionHandle,
}

impl ConsoleState {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

struct ApiError(SessionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

async fn snapshot_handler(State(state): State<Arc<ConsoleState>>) -> Json<HierarchySnapshot> {
    Json((*state.session.current_snapshot()).clone())
}

async fn events_handler(
    State(state): State<Arc<ConsoleState>>,
    Json(event): Json<SessionEvent>,
) -> Result<Json<HierarchySnapshot>, ApiError> {
    let snapshot = state.session.submit(event).await.map_err(ApiError)?;
    Ok(Json((*snapshot).clone()))
}

async fn slots_handler(
    State(state): State<Arc<ConsoleState>>,
) -> Result<Json<Vec<SlotKey>>, ApiError> {
    Ok(Json(state.session.active_slots().await.map_err(ApiError)?))
}

/// Build the HTTP API router over a running session.
pub fn build_router(state: Arc<ConsoleState>) -> Router {
    Router::new()
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/events", post(events_handler))
        .route("/api/v1/slots", get(slots_handler))
        .with_state(state)
}

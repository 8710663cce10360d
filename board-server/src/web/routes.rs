//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tower_http::trace::TraceLayer;

use super::state::{AppState, BoardSnapshot};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/boards", get(list_boards))
        .route("/boards/:station_id", get(get_board))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List the station ids that have a board.
async fn list_boards(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.station_ids().await)
}

/// The latest board for one station.
async fn get_board(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<Json<BoardSnapshot>, StatusCode> {
    state
        .board(&station_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

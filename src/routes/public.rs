use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::{commands::ExportResponse, snapshot::TournamentSnapshot},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only endpoints used by screens that cannot hold a socket open.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/export", post(export_state))
}

/// Return the full tournament snapshot.
#[utoipa::path(
    get,
    path = "/state",
    tag = "public",
    responses((status = 200, description = "Current tournament", body = TournamentSnapshot))
)]
pub async fn get_state(State(state): State<SharedState>) -> Json<TournamentSnapshot> {
    Json(public_service::get_state(&state).await)
}

/// Return the snapshot as pretty-printed JSON text.
#[utoipa::path(
    post,
    path = "/export",
    tag = "public",
    responses((status = 200, description = "Tournament export", body = ExportResponse))
)]
pub async fn export_state(
    State(state): State<SharedState>,
) -> Result<Json<ExportResponse>, AppError> {
    Ok(Json(public_service::export_state(&state).await?))
}

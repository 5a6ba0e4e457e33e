use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{participant::ScoreboardResponse, reveal::RevealView},
    services::{participant_service, reveal_service},
    state::SharedState,
};

/// Read-only routes consumed by scoreboard and reveal screens.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/scoreboard", get(scoreboard))
        .route("/public/reveal", get(reveal))
}

/// Ranked participants with the loading flag and latest error.
#[utoipa::path(
    get,
    path = "/public/scoreboard",
    tag = "public",
    responses((status = 200, description = "Current ranked scoreboard", body = ScoreboardResponse))
)]
pub async fn scoreboard(State(state): State<SharedState>) -> Json<ScoreboardResponse> {
    Json(participant_service::scoreboard(&state).await)
}

/// Latest reveal frame.
#[utoipa::path(
    get,
    path = "/public/reveal",
    tag = "public",
    responses((status = 200, description = "Current reveal state", body = RevealView))
)]
pub async fn reveal(State(state): State<SharedState>) -> Json<RevealView> {
    Json(reveal_service::current(&state))
}

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};

use crate::{
    dto::{
        admin::{AccessRequest, AccessResponse},
        participant::{
            CreateParticipantRequest, ScoreboardResponse, UpdateParticipantRequest, WriteAccepted,
        },
        reveal::{RevealStartResponse, RevealView},
    },
    error::AppError,
    services::{access_service, participant_service, reveal_service},
    state::SharedState,
};

const ADMIN_CODE_HEADER: &str = "x-admin-code";

/// Ungated route used by the admin screen to check a typed code.
pub fn access_router() -> Router<SharedState> {
    Router::new().route("/admin/access", post(access))
}

/// Admin-only participant management and reveal control.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/participants",
            get(list_participants).post(add_participant),
        )
        .route(
            "/admin/participants/{id}",
            patch(update_participant).delete(delete_participant),
        )
        .route("/admin/participants/reload", post(reload_participants))
        .route("/admin/reveal/start", post(start_reveal))
        .route("/admin/reveal/reset", post(reset_reveal))
        .route_layer(middleware::from_fn_with_state(state, require_admin_code))
}

/// Check a typed admin code.
///
/// A denial carries how long the message should stay visible.
#[utoipa::path(
    post,
    path = "/admin/access",
    tag = "admin",
    request_body = AccessRequest,
    responses(
        (status = 200, description = "Code accepted", body = AccessResponse),
        (status = 401, description = "Invalid code", body = AccessResponse)
    )
)]
pub async fn access(
    State(state): State<SharedState>,
    Json(payload): Json<AccessRequest>,
) -> (StatusCode, Json<AccessResponse>) {
    match access_service::verify(&state, &payload.code) {
        Ok(()) => (StatusCode::OK, Json(AccessResponse::granted())),
        Err(err) => (
            StatusCode::UNAUTHORIZED,
            Json(AccessResponse::denied(
                err.to_string(),
                access_service::clear_after_ms(&state),
            )),
        ),
    }
}

/// Ranked participants as seen by the admin panel.
#[utoipa::path(
    get,
    path = "/admin/participants",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code")),
    responses((status = 200, description = "Current ranked participants", body = ScoreboardResponse))
)]
pub async fn list_participants(State(state): State<SharedState>) -> Json<ScoreboardResponse> {
    Json(participant_service::scoreboard(&state).await)
}

/// Add a participant. The record shows up once the change feed delivers it.
#[utoipa::path(
    post,
    path = "/admin/participants",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code")),
    request_body = CreateParticipantRequest,
    responses(
        (status = 202, description = "Insert accepted", body = WriteAccepted),
        (status = 400, description = "Blank name/college or invalid score"),
        (status = 503, description = "Participant table unavailable")
    )
)]
pub async fn add_participant(
    State(state): State<SharedState>,
    Json(payload): Json<CreateParticipantRequest>,
) -> Result<(StatusCode, Json<WriteAccepted>), AppError> {
    let id = participant_service::add(&state, payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(WriteAccepted {
            id,
            message: "participant insert accepted".into(),
        }),
    ))
}

/// Update any subset of a participant's fields.
#[utoipa::path(
    patch,
    path = "/admin/participants/{id}",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code"),
    ("id" = String, Path, description = "Identifier of the participant to update")),
    request_body = UpdateParticipantRequest,
    responses(
        (status = 202, description = "Update accepted", body = WriteAccepted),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn update_participant(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateParticipantRequest>,
) -> Result<(StatusCode, Json<WriteAccepted>), AppError> {
    participant_service::update(&state, id.clone(), payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(WriteAccepted {
            id,
            message: "participant update accepted".into(),
        }),
    ))
}

/// Delete a participant.
#[utoipa::path(
    delete,
    path = "/admin/participants/{id}",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code"),
    ("id" = String, Path, description = "Identifier of the participant to delete")),
    responses(
        (status = 202, description = "Delete accepted", body = WriteAccepted),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn delete_participant(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WriteAccepted>), AppError> {
    participant_service::delete(&state, id.clone()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(WriteAccepted {
            id,
            message: "participant delete accepted".into(),
        }),
    ))
}

/// Re-read the whole participant table.
#[utoipa::path(
    post,
    path = "/admin/participants/reload",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code")),
    responses(
        (status = 200, description = "Reloaded scoreboard", body = ScoreboardResponse),
        (status = 503, description = "Participant table unavailable")
    )
)]
pub async fn reload_participants(
    State(state): State<SharedState>,
) -> Result<Json<ScoreboardResponse>, AppError> {
    participant_service::load(&state).await?;
    Ok(Json(participant_service::scoreboard(&state).await))
}

/// Start the cinematic reveal of the current top participants.
#[utoipa::path(
    post,
    path = "/admin/reveal/start",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code")),
    responses((status = 200, description = "Reveal started, or nothing to reveal", body = RevealStartResponse))
)]
pub async fn start_reveal(State(state): State<SharedState>) -> Json<RevealStartResponse> {
    Json(reveal_service::start(&state).await)
}

/// Stop any playback and return the reveal to idle.
#[utoipa::path(
    post,
    path = "/admin/reveal/reset",
    tag = "admin",
    params(("X-Admin-Code" = String, Header, description = "Shared admin code")),
    responses((status = 200, description = "Reveal back to idle", body = RevealView))
)]
pub async fn reset_reveal(State(state): State<SharedState>) -> Json<RevealView> {
    Json(reveal_service::reset(&state).await)
}

async fn require_admin_code(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing admin code header `X-Admin-Code`".into()))?;

    access_service::verify(&state, provided).map_err(AppError::from)?;
    Ok(next.run(req).await)
}

use axum::Router;

use crate::state::SharedState;

/// Admin gate, participant management and reveal control.
pub mod admin;
/// Swagger UI.
pub mod docs;
/// Health check.
pub mod health;
/// Read-only scoreboard and reveal.
pub mod public;
/// Public event stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(public::router())
        .merge(admin::access_router())
        .merge(admin::router(state.clone()));

    api_router.merge(docs::router()).with_state(state)
}

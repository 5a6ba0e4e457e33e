use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the scoreboard backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::public::scoreboard,
        crate::routes::public::reveal,
        crate::routes::admin::access,
        crate::routes::admin::list_participants,
        crate::routes::admin::add_participant,
        crate::routes::admin::update_participant,
        crate::routes::admin::delete_participant,
        crate::routes::admin::reload_participants,
        crate::routes::admin::start_reveal,
        crate::routes::admin::reset_reveal,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::participant::ParticipantView,
            crate::dto::participant::ScoreboardResponse,
            crate::dto::participant::CreateParticipantRequest,
            crate::dto::participant::UpdateParticipantRequest,
            crate::dto::participant::WriteAccepted,
            crate::dto::reveal::RevealView,
            crate::dto::reveal::RevealEntryView,
            crate::dto::reveal::RevealPhaseKind,
            crate::dto::reveal::RevealStageKind,
            crate::dto::reveal::RevealStartResponse,
            crate::dto::admin::AccessRequest,
            crate::dto::admin::AccessResponse,
            crate::dto::sse::SystemStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "public", description = "Read-only scoreboard and reveal state"),
        (name = "admin", description = "Participant management and reveal control"),
    )
)]
/// OpenAPI document of every route.
pub struct ApiDoc;

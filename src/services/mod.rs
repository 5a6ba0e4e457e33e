/// Shared-code gate for the admin surface.
pub mod access_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Participant reads, writes and change application.
pub mod participant_service;
/// Reveal commands and frame broadcasting.
pub mod reveal_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with backoff and degraded mode.
pub mod storage_supervisor;
/// Push-feed subscription feeding the participant cache.
pub mod sync_service;

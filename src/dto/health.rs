use serde::Serialize;
use utoipa::ToSchema;

/// Overall backend condition reported by `/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A participant table is connected and answering.
    Ok,
    /// No participant table is reachable; writes are refused.
    Degraded,
}

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall condition.
    pub status: HealthStatus,
    /// Configured participant table backend (`memory`, `couch` or `mongo`).
    pub store: String,
}

impl HealthResponse {
    /// Pair a status with the configured backend name.
    pub fn new(status: HealthStatus, store: &str) -> Self {
        Self {
            status,
            store: store.to_string(),
        }
    }
}

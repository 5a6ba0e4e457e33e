use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Ping the installed participant table and combine the result with the
/// supervisor's degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = state.config().store().as_str();

    let reachable = match state.table().await {
        Some(table) => match table.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, store, "participant table health check failed");
                false
            }
        },
        None => false,
    };

    let status = if reachable && !state.is_degraded() {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };
    HealthResponse::new(status, store)
}

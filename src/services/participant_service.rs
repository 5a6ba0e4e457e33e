//! Participant operations: full reads, write-through mutations and feed application.
//!
//! Every failure is stored as the cache's single latest error before being returned,
//! so readers of the scoreboard see it without the caller having to relay it.
//! Writes never touch the cached list; their effect arrives through the push feed.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dao::models::ChangeEvent,
    dto::participant::{CreateParticipantRequest, ScoreboardResponse, UpdateParticipantRequest},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Snapshot the scoreboard as served to readers.
pub async fn scoreboard(state: &SharedState) -> ScoreboardResponse {
    let store = state.participants().read().await;
    ScoreboardResponse::from_store(&store, state.is_degraded())
}

/// Replace the cache with a full ordered read of the remote table.
///
/// On failure the previous cache stays in place.
pub async fn load(state: &SharedState) -> Result<(), ServiceError> {
    state.participants().write().await.begin_load();

    let result = match state.require_table().await {
        Ok(table) => table.fetch_ranked().await.map_err(ServiceError::from),
        Err(err) => Err(err),
    };

    let outcome = {
        let mut store = state.participants().write().await;
        match result {
            Ok(records) => {
                info!(count = records.len(), "participants loaded");
                store.finish_load(records);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load participants");
                store.fail_load(err.to_string());
                Err(err)
            }
        }
    };

    publish_scoreboard(state).await;
    outcome
}

/// Insert a participant remotely, returning the identifier the table assigned.
pub async fn add(
    state: &SharedState,
    request: CreateParticipantRequest,
) -> Result<String, ServiceError> {
    let result = async {
        request.validate()?;
        let table = state.require_table().await?;
        Ok::<_, ServiceError>(table.insert(request.into()).await?)
    }
    .await;

    match result {
        Ok(id) => {
            debug!(%id, "participant insert accepted");
            Ok(id)
        }
        Err(err) => Err(remember_failure(state, "add", err).await),
    }
}

/// Apply a partial update to a remote participant, stamping `updated_at`.
pub async fn update(
    state: &SharedState,
    id: String,
    request: UpdateParticipantRequest,
) -> Result<(), ServiceError> {
    let result = async {
        request.validate()?;
        let table = state.require_table().await?;
        let patch = request.into_patch(SystemTime::now());
        Ok::<_, ServiceError>(table.update(id.clone(), patch).await?)
    }
    .await;

    match result {
        Ok(()) => {
            debug!(%id, "participant update accepted");
            Ok(())
        }
        Err(err) => Err(remember_failure(state, "update", err).await),
    }
}

/// Remove a participant remotely.
pub async fn delete(state: &SharedState, id: String) -> Result<(), ServiceError> {
    let result = async {
        let table = state.require_table().await?;
        Ok::<_, ServiceError>(table.delete(id.clone()).await?)
    }
    .await;

    match result {
        Ok(()) => {
            debug!(%id, "participant delete accepted");
            Ok(())
        }
        Err(err) => Err(remember_failure(state, "delete", err).await),
    }
}

/// Apply one push-feed event to the cache and broadcast the re-ranked list.
pub async fn apply_change(state: &SharedState, event: ChangeEvent) {
    debug!(kind = event.kind(), id = event.id(), "applying participant change");
    state.participants().write().await.apply(event);
    publish_scoreboard(state).await;
}

async fn remember_failure(
    state: &SharedState,
    operation: &'static str,
    err: ServiceError,
) -> ServiceError {
    warn!(operation, error = %err, "participant write failed");
    state
        .participants()
        .write()
        .await
        .record_error(err.to_string());
    publish_scoreboard(state).await;
    err
}

async fn publish_scoreboard(state: &SharedState) {
    let snapshot = scoreboard(state).await;
    sse_events::broadcast_scoreboard(state, &snapshot);
}

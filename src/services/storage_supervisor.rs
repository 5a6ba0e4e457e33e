use std::{future::Future, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};
use tracing::{info, warn};

use crate::{
    dao::{participant_table::ParticipantTable, storage::StorageError},
    services::{participant_service, sse_events, sync_service},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect the participant table, keep its push feed subscribed and toggle
/// degraded mode while it is unreachable.
///
/// The feed is subscribed before the initial load so no change falls between them.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ParticipantTable>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(table) => {
                state.install_table(table.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                let mut sync = sync_service::start(&state, table.clone());
                let _ = participant_service::load(&state).await;

                loop {
                    if sync.is_finished() {
                        warn!("participant feed stopped; resubscribing");
                        sync = sync_service::start(&state, table.clone());
                        let _ = participant_service::load(&state).await;
                    }

                    match table.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(_) => {
                            let mut attempt = 0;
                            let mut reconnect_delay = INITIAL_DELAY;
                            let mut reconnected = false;

                            while attempt < MAX_RECONNECT_ATTEMPTS {
                                match table.try_reconnect().await {
                                    Ok(()) => {
                                        info!(
                                            "storage reconnection succeeded after health check failure"
                                        );
                                        reconnected = true;
                                        break;
                                    }
                                    Err(reconnect_err) => {
                                        if attempt == 0 {
                                            warn!(
                                                attempt, error = %reconnect_err,
                                                "storage reconnect first attempt failed; entering in degraded mode"
                                            );
                                            state.update_degraded(true);
                                        } else {
                                            warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                        };
                                        attempt += 1;
                                        sleep(reconnect_delay).await;
                                        reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                                    }
                                }
                            }

                            if reconnected {
                                state.update_degraded(false);
                                // Changes may have been missed while disconnected.
                                sync = sync_service::start(&state, table.clone());
                                let _ = participant_service::load(&state).await;
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            } else {
                                warn!(
                                    "exhausted storage reconnect attempts; staying in degraded mode"
                                );
                                break;
                            }
                        }
                    }
                }

                sync.stop();
                state.clear_table().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Relay degraded mode changes to SSE clients as `system.status`.
pub fn spawn_status_broadcaster(state: &SharedState) -> JoinHandle<()> {
    let mut degraded = state.degraded_watcher();
    let weak = Arc::downgrade(state);
    tokio::spawn(async move {
        while degraded.changed().await.is_ok() {
            let value = *degraded.borrow_and_update();
            let Some(state) = weak.upgrade() else {
                break;
            };
            sse_events::broadcast_system_status(&state, value);
        }
    })
}

#[cfg(test)]
mod tests {
    use futures::{future::BoxFuture, stream::BoxStream};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{
                ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity,
            },
            participant_table::memory::MemoryParticipantTable,
            storage::StorageResult,
        },
        state::AppState,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("offline")]
    struct Offline;

    /// Table whose health check always fails and cannot reconnect.
    struct UnreachableTable;

    impl ParticipantTable for UnreachableTable {
        fn fetch_ranked(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn insert(&self, _: NewParticipantEntity) -> BoxFuture<'static, StorageResult<String>> {
            Box::pin(async { Err(StorageError::unavailable("offline".into(), Offline)) })
        }
        fn update(
            &self,
            _: String,
            _: ParticipantPatchEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(StorageError::unavailable("offline".into(), Offline)) })
        }
        fn delete(&self, _: String) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(StorageError::unavailable("offline".into(), Offline)) })
        }
        fn subscribe(&self) -> BoxStream<'static, StorageResult<ChangeEvent>> {
            Box::pin(futures::stream::pending())
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(StorageError::unavailable("offline".into(), Offline)) })
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(StorageError::unavailable("offline".into(), Offline)) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn installs_the_table_and_loads() {
        let state = AppState::new(AppConfig::default());
        let table = MemoryParticipantTable::new();
        table
            .insert(NewParticipantEntity {
                name: "Seeded".into(),
                college: "Central".into(),
                round1: 4.0,
                round2: 0.0,
                round3: 0.0,
                round4: 0.0,
                round5: 0.0,
            })
            .await
            .unwrap();

        let supervisor = tokio::spawn(run(state.clone(), move || {
            let table: Arc<dyn ParticipantTable> = Arc::new(table.clone());
            async move { Ok::<_, StorageError>(table) }
        }));
        sleep(Duration::from_millis(100)).await;

        assert!(!state.is_degraded());
        assert_eq!(state.participants().read().await.participants().len(), 1);
        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_health_checks_enter_degraded_mode() {
        let state = AppState::new(AppConfig::default());

        let supervisor = tokio::spawn(run(state.clone(), || async {
            Ok::<_, StorageError>(Arc::new(UnreachableTable) as Arc<dyn ParticipantTable>)
        }));

        // First reconnect attempt failed at 0s, the next one is due at 1s.
        sleep(Duration::from_millis(500)).await;
        assert!(state.is_degraded());
        assert!(state.table().await.is_some());

        // Attempts at 0s, 1s and 3s fail; the table is dropped at 7s.
        sleep(Duration::from_secs(7)).await;
        assert!(state.is_degraded());
        assert!(state.table().await.is_none());
        supervisor.abort();
    }
}

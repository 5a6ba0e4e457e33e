use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{future::BoxFuture, stream::BoxStream};

use scoreboard_back::{
    config::AppConfig,
    dao::{
        models::{ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity},
        participant_table::{ParticipantTable, memory::MemoryParticipantTable},
        storage::{StorageError, StorageResult},
    },
    dto::participant::{CreateParticipantRequest, UpdateParticipantRequest},
    error::ServiceError,
    services::{participant_service, sync_service},
    state::{AppState, SharedState},
};

#[derive(Debug, thiserror::Error)]
#[error("connection reset")]
struct ConnectionReset;

/// Memory table whose reads and writes can be switched to fail.
#[derive(Clone)]
struct FlakyTable {
    inner: MemoryParticipantTable,
    failing: Arc<AtomicBool>,
}

impl FlakyTable {
    fn new() -> Self {
        Self {
            inner: MemoryParticipantTable::new(),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                "remote unreachable".into(),
                ConnectionReset,
            ))
        } else {
            Ok(())
        }
    }
}

impl ParticipantTable for FlakyTable {
    fn fetch_ranked(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        match self.check() {
            Ok(()) => self.inner.fetch_ranked(),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }

    fn insert(&self, participant: NewParticipantEntity) -> BoxFuture<'static, StorageResult<String>> {
        match self.check() {
            Ok(()) => self.inner.insert(participant),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }

    fn update(
        &self,
        id: String,
        patch: ParticipantPatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match self.check() {
            Ok(()) => self.inner.update(id, patch),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }

    fn delete(&self, id: String) -> BoxFuture<'static, StorageResult<()>> {
        match self.check() {
            Ok(()) => self.inner.delete(id),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }

    fn subscribe(&self) -> BoxStream<'static, StorageResult<ChangeEvent>> {
        self.inner.subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.check();
        Box::pin(async move { result })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}

fn create(name: &str, round1: f64) -> CreateParticipantRequest {
    CreateParticipantRequest {
        name: name.into(),
        college: "Central".into(),
        round1,
        round2: 0.0,
        round3: 0.0,
        round4: 0.0,
        round5: 0.0,
    }
}

async fn connected(table: FlakyTable) -> SharedState {
    let state = AppState::new(AppConfig::default());
    state.install_table(Arc::new(table)).await;
    state
}

async fn ranked_names(state: &SharedState) -> Vec<(String, usize)> {
    state
        .participants()
        .read()
        .await
        .participants()
        .iter()
        .map(|p| (p.name.clone(), p.rank))
        .collect()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn add_is_not_visible_until_the_feed_or_a_load_delivers_it() {
    let table = FlakyTable::new();
    let state = connected(table.clone()).await;

    participant_service::add(&state, create("X", 5.0)).await.unwrap();
    assert!(ranked_names(&state).await.is_empty());

    participant_service::load(&state).await.unwrap();
    assert_eq!(ranked_names(&state).await, [("X".to_string(), 1)]);
}

#[tokio::test]
async fn feed_echo_after_load_does_not_duplicate() {
    let table = FlakyTable::new();
    let state = connected(table.clone()).await;
    let sync = sync_service::start(&state, Arc::new(table.clone()));

    participant_service::add(&state, create("X", 5.0)).await.unwrap();
    participant_service::load(&state).await.unwrap();
    settle().await;

    assert_eq!(ranked_names(&state).await, [("X".to_string(), 1)]);
    sync.stop();
}

#[tokio::test]
async fn load_twice_yields_identical_cache() {
    let table = FlakyTable::new();
    let state = connected(table.clone()).await;
    for (name, score) in [("A", 10.0), ("B", 30.0), ("C", 20.0), ("D", 20.0)] {
        participant_service::add(&state, create(name, score))
            .await
            .unwrap();
    }

    participant_service::load(&state).await.unwrap();
    let first = state.participants().read().await.participants().to_vec();
    participant_service::load(&state).await.unwrap();
    let second = state.participants().read().await.participants().to_vec();

    assert_eq!(first, second);
    let names: Vec<_> = first.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["B", "C", "D", "A"]);
}

#[tokio::test]
async fn failed_load_keeps_last_known_good_data() {
    let table = FlakyTable::new();
    let state = connected(table.clone()).await;
    participant_service::add(&state, create("A", 1.0)).await.unwrap();
    participant_service::load(&state).await.unwrap();

    table.set_failing(true);
    let err = participant_service::load(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    let board = participant_service::scoreboard(&state).await;
    assert!(!board.loading);
    assert!(board.error.as_deref().unwrap().contains("remote unreachable"));
    assert_eq!(board.participants.len(), 1);

    table.set_failing(false);
    participant_service::load(&state).await.unwrap();
    assert_eq!(participant_service::scoreboard(&state).await.error, None);
}

#[tokio::test]
async fn failed_writes_record_only_the_latest_error() {
    let table = FlakyTable::new();
    let state = connected(table.clone()).await;
    table.set_failing(true);

    assert!(participant_service::add(&state, create("A", 1.0)).await.is_err());
    let update = UpdateParticipantRequest {
        round1: Some(2.0),
        ..Default::default()
    };
    assert!(
        participant_service::update(&state, "missing".into(), update)
            .await
            .is_err()
    );
    table.set_failing(false);
    let err = participant_service::delete(&state, "missing".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let board = participant_service::scoreboard(&state).await;
    assert!(board.error.as_deref().unwrap().contains("missing"));
    assert!(board.participants.is_empty());
}

#[tokio::test]
async fn writes_without_a_table_report_degraded_mode() {
    let state = AppState::new(AppConfig::default());

    let err = participant_service::add(&state, create("A", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
    assert!(participant_service::load(&state).await.is_err());
}

#[tokio::test]
async fn dropping_the_state_ends_the_subscription() {
    let table = MemoryParticipantTable::new();
    let state = AppState::new(AppConfig::default());
    let sync = sync_service::start(&state, Arc::new(table.clone()));
    drop(state);

    table
        .insert(NewParticipantEntity {
            name: "Late".into(),
            college: "C".into(),
            round1: 1.0,
            round2: 0.0,
            round3: 0.0,
            round4: 0.0,
            round5: 0.0,
        })
        .await
        .unwrap();
    settle().await;

    assert!(sync.is_finished());
}

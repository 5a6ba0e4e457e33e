/// Ranked participant cache.
pub mod participants;
/// Reveal state machine and its timer.
pub mod reveal;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::participant_table::ParticipantTable, error::ServiceError};

pub use self::participants::{Participant, ParticipantStore};
pub use self::reveal::RevealSequencer;
pub use self::sse::SseHub;

/// Handle to the state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: the remote table handle, the ranked cache,
/// the reveal sequencer and the SSE fan-out.
pub struct AppState {
    config: AppConfig,
    table: RwLock<Option<Arc<dyn ParticipantTable>>>,
    participants: RwLock<ParticipantStore>,
    reveal: RevealSequencer,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a participant table is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            reveal: RevealSequencer::new(config.reveal_timings()),
            public_sse: SseHub::new(config.sse_capacity()),
            table: RwLock::new(None),
            participants: RwLock::new(ParticipantStore::new()),
            degraded: degraded_tx,
            config,
        })
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current participant table, if one is installed.
    pub async fn table(&self) -> Option<Arc<dyn ParticipantTable>> {
        let guard = self.table.read().await;
        guard.as_ref().cloned()
    }

    /// Current participant table or [`ServiceError::Degraded`].
    pub async fn require_table(&self) -> Result<Arc<dyn ParticipantTable>, ServiceError> {
        self.table().await.ok_or(ServiceError::Degraded)
    }

    /// Install a participant table implementation and leave degraded mode.
    pub async fn install_table(&self, table: Arc<dyn ParticipantTable>) {
        {
            let mut guard = self.table.write().await;
            *guard = Some(table);
        }
        self.update_degraded(false);
    }

    /// Remove the current participant table and enter degraded mode.
    pub async fn clear_table(&self) {
        {
            let mut guard = self.table.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Whether the backend currently runs without a reachable table.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when it changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Ranked participant cache. Only the participant services write to it.
    pub fn participants(&self) -> &RwLock<ParticipantStore> {
        &self.participants
    }

    /// Reveal playback driver.
    pub fn reveal(&self) -> &RevealSequencer {
        &self.reveal
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }
}

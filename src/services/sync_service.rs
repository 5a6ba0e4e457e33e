//! Keeps the participant cache in step with the remote push feed.

use std::sync::Arc;

use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    dao::{models::ChangeEvent, participant_table::ParticipantTable},
    services::participant_service,
    state::SharedState,
};

const FEED_BUFFER: usize = 64;

/// Owns the subscription tasks; dropping it unsubscribes.
pub struct SyncHandle {
    forwarder: JoinHandle<()>,
    handler: JoinHandle<()>,
}

impl SyncHandle {
    /// Whether the feed ended or the handler stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.forwarder.is_finished() || self.handler.is_finished()
    }

    /// Unsubscribe from the feed.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.handler.abort();
    }
}

/// Subscribe to `table`'s change feed and apply every event to the cache.
///
/// Events are funnelled through one channel into a single handler so each one
/// produces a fully re-ranked list before the next is applied. The tasks only
/// hold a weak reference to `state`.
pub fn start(state: &SharedState, table: Arc<dyn ParticipantTable>) -> SyncHandle {
    let mut feed = table.subscribe();
    let (tx, mut rx) = mpsc::channel::<ChangeEvent>(FEED_BUFFER);

    let forwarder = tokio::spawn(async move {
        while let Some(item) = feed.next().await {
            match item {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "participant feed delivered an error"),
            }
        }
        info!("participant feed closed");
    });

    let weak = Arc::downgrade(state);
    let handler = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(state) = weak.upgrade() else {
                break;
            };
            participant_service::apply_change(&state, event).await;
        }
    });

    SyncHandle { forwarder, handler }
}

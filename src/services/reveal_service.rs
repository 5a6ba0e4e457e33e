//! Reveal commands and the task relaying sequencer frames to SSE clients.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    dto::reveal::{RevealStartResponse, RevealView},
    services::sse_events,
    state::{SharedState, reveal::build_snapshot},
};

/// Snapshot the current top participants and start a playback.
///
/// With nobody to reveal this is a no-op and `started` is `false`.
pub async fn start(state: &SharedState) -> RevealStartResponse {
    let snapshot = {
        let store = state.participants().read().await;
        build_snapshot(store.participants(), state.config().reveal_size())
    };

    let size = snapshot.len();
    let started = state.reveal().start(snapshot).await;
    if started {
        info!(size, "reveal started");
    } else {
        debug!("reveal requested with no participants");
    }

    RevealStartResponse {
        started,
        reveal: current(state),
    }
}

/// Cancel any playback and return to idle.
pub async fn reset(state: &SharedState) -> RevealView {
    state.reveal().reset().await;
    info!("reveal reset");
    current(state)
}

/// Most recent reveal frame.
pub fn current(state: &SharedState) -> RevealView {
    RevealView::from(&state.reveal().current())
}

/// Forward every published reveal frame to the public SSE stream.
pub fn spawn_broadcaster(state: &SharedState) -> JoinHandle<()> {
    let mut frames = state.reveal().subscribe();
    let weak = Arc::downgrade(state);
    tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            let frame = frames.borrow_and_update().clone();
            let Some(state) = weak.upgrade() else {
                break;
            };
            sse_events::broadcast_reveal(&state, &frame);
        }
    })
}

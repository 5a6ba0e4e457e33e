use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        participant::ScoreboardResponse,
        reveal::RevealView,
        sse::{ServerEvent, SystemStatus},
    },
    state::{SharedState, reveal::RevealFrame},
};

const EVENT_SCOREBOARD_UPDATED: &str = "scoreboard.updated";
const EVENT_REVEAL_UPDATED: &str = "reveal.updated";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the full ranked scoreboard after any cache change.
pub fn broadcast_scoreboard(state: &SharedState, scoreboard: &ScoreboardResponse) {
    send_public_event(state, EVENT_SCOREBOARD_UPDATED, scoreboard);
}

/// Broadcast a new reveal frame.
pub fn broadcast_reveal(state: &SharedState, frame: &RevealFrame) {
    send_public_event(state, EVENT_REVEAL_UPDATED, &RevealView::from(frame));
}

/// Broadcast that the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(payload) => {
            let delivered = state.public_sse().broadcast(payload);
            debug!(event, delivered, "public SSE event sent");
        }
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn status_events_are_named_and_serialized() {
        let state = AppState::new(AppConfig::default());
        let mut rx = state.public_sse().subscribe();

        broadcast_system_status(&state, true);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SYSTEM_STATUS));
        assert_eq!(event.data, r#"{"degraded":true}"#);
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        let state = AppState::new(AppConfig::default());
        broadcast_system_status(&state, false);
        assert_eq!(state.public_sse().subscriber_count(), 0);
    }
}

use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out point for the public SSE stream.
///
/// Events sent while nobody listens are dropped; a slow subscriber skips what
/// it lagged behind on.
pub struct SseHub {
    events: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// `capacity` bounds how far a subscriber may lag before losing events.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    /// Register a subscriber for every event sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Send `event` to the current subscribers, returning how many got it.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Number of connected SSE streams.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_only_current_subscribers() {
        let hub = SseHub::new(4);
        assert_eq!(hub.broadcast(ServerEvent::new(Some("info".into()), "lost".into())), 0);

        let mut rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.broadcast(ServerEvent::new(None, "kept".into())), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data, "kept");
        assert!(event.event.is_none());
    }
}

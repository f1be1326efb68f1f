use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use murmur_types::events::FeedEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans feed events out to every subscriber (the `/events` socket, tests).
/// Best effort: with no subscribers events are dropped, and slow subscribers
/// see `Lagged` rather than blocking publishers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<FeedEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    pub fn broadcast(&self, event: FeedEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Signal that any cached timeline for these users is stale.
    pub fn invalidate_timelines(&self, user_ids: &[Uuid]) {
        for user_id in user_ids {
            self.broadcast(FeedEvent::TimelineInvalidated { user_id: *user_id });
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

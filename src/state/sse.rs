use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Capacity of each hub; slower subscribers skip what they missed.
const HUB_CAPACITY: usize = 32;

/// Fan-out hubs for the two view audiences.
pub struct SseState {
    public: SseHub,
    admin: SseHub,
}

impl Default for SseState {
    fn default() -> Self {
        Self {
            public: SseHub::new(HUB_CAPACITY),
            admin: SseHub::new(HUB_CAPACITY),
        }
    }
}

impl SseState {
    /// Every view, admins included.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Admin consoles only.
    pub fn admin(&self) -> &SseHub {
        &self.admin
    }
}

/// Broadcast hub for events that are not derived per view (completions, info, status).
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Number of connected views listening on this hub.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Deliver to current subscribers; an event with no listener is dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

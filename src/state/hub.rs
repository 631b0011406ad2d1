use tokio::sync::broadcast;

use crate::dto::ws::ServerFrame;

/// Simple broadcast hub fanning frames out to every connected viewer.
pub struct BroadcastHub {
    sender: broadcast::Sender<ServerFrame>,
}

impl BroadcastHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent frames.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerFrame> {
        self.sender.subscribe()
    }

    /// Send a frame to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, frame: ServerFrame) {
        let _ = self.sender.send(frame);
    }

    /// Number of live subscriptions.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{ReservationChange, VenueId};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for committed reservation changes, one channel per venue.
/// Hosts showing a venue calendar subscribe and refetch on every message.
pub struct NotifyHub {
    channels: DashMap<VenueId, broadcast::Sender<ReservationChange>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes on a venue. Creates the channel if needed.
    pub fn subscribe(&self, venue_id: VenueId) -> broadcast::Receiver<ReservationChange> {
        let sender = self
            .channels
            .entry(venue_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, change: &ReservationChange) {
        if let Some(sender) = self.channels.get(&change.venue_id()) {
            let _ = sender.send(change.clone());
        }
    }

    /// Drop channels whose subscribers have all gone away.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

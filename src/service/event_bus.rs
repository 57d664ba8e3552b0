// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast bus for health transitions.

use tokio::sync::broadcast;

use super::Health;

/// Default channel capacity for the health bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A health transition of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    /// Name of the service, e.g. `link/TV Light`.
    pub service: String,
    /// The new health.
    pub health: Health,
}

/// Bus broadcasting [`HealthEvent`]s to every subscriber.
///
/// If a subscriber falls behind by more than the capacity, it loses the
/// oldest events (`RecvError::Lagged`).
#[derive(Debug, Clone)]
pub struct HealthBus {
    sender: broadcast::Sender<HealthEvent>,
}

impl HealthBus {
    /// Creates a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event. Without subscribers it is silently discarded.
    pub fn publish(&self, event: HealthEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for HealthBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(service: &str) -> HealthEvent {
        HealthEvent {
            service: service.to_string(),
            health: Health::ok(),
        }
    }

    #[test]
    fn subscribe_increments_count() {
        let bus = HealthBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn publish_delivers_to_multiple_subscribers() {
        let bus = HealthBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(event("remote/Dimmer"));

        assert_eq!(rx1.recv().await.unwrap().service, "remote/Dimmer");
        assert_eq!(rx2.recv().await.unwrap().service, "remote/Dimmer");
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = HealthBus::with_capacity(4);
        bus.publish(event("x"));
    }

    #[test]
    fn clone_shares_same_channel() {
        let bus1 = HealthBus::new();
        let bus2 = bus1.clone();
        let _rx = bus1.subscribe();
        assert_eq!(bus2.subscriber_count(), 1);
    }
}

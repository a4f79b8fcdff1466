//! Broadcast event bus
//!
//! Thin wrapper over `tokio::sync::broadcast` used to publish provider health
//! transitions. Slow subscribers lose the oldest events rather than blocking
//! publishers.

use tokio::sync::broadcast;

pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
    capacity: usize,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish to every subscriber; returns how many received it
    pub fn publish(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(256)
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let bus: EventBus<u32> = EventBus::default();
        assert_eq!(bus.publish(1), 0);
        assert_eq!(bus.capacity(), 256);
    }

    #[tokio::test]
    async fn subscribers_see_later_events_only() {
        let bus: EventBus<&'static str> = EventBus::new(8);
        bus.publish("before");
        let mut rx = bus.subscribe();
        assert_eq!(bus.publish("after"), 1);
        assert_eq!(rx.recv().await.unwrap(), "after");
        assert_eq!(bus.subscriber_count(), 1);
    }
}

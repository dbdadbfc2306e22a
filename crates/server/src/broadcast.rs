//! Fan-out of property events to connected clients.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use propwatch_shared::{event_id, EventKind, PropertyRecord, WireMessage};
use tokio::sync::broadcast;

/// One server-side event, stamped with the time it fired.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEvent {
    pub kind: EventKind,
    pub property: PropertyRecord,
    pub timestamp: DateTime<Utc>,
}

impl PropertyEvent {
    pub fn new(kind: EventKind, property: PropertyRecord) -> Self {
        Self {
            kind,
            property,
            timestamp: Utc::now(),
        }
    }

    /// The id clients will dedup this event under.
    pub fn id(&self) -> String {
        event_id(self.kind, &self.property.id, self.timestamp)
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage::event(self.kind, self.property.clone(), self.timestamp)
    }
}

/// Entry point for whatever produces entity mutations.
pub trait EventPublisher: Send + Sync {
    /// Emit one event; returns how many connections it was handed to.
    fn publish(&self, event: PropertyEvent) -> usize;
}

/// Broadcast channel every WebSocket connection listens on.
#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Arc<PropertyEvent>>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PropertyEvent>> {
        self.sender.subscribe()
    }
}

impl EventPublisher for Broadcaster {
    fn publish(&self, event: PropertyEvent) -> usize {
        let id = event.id();
        // An error only means nobody is listening right now.
        let delivered = self.sender.send(Arc::new(event)).unwrap_or(0);
        tracing::debug!(%id, delivered, "event published");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_every_receiver() {
        let broadcaster = Broadcaster::new(8);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        let event = PropertyEvent::new(EventKind::NewEntity, PropertyRecord::new("p1"));
        assert_eq!(broadcaster.publish(event.clone()), 2);
        assert_eq!(*a.recv().await.unwrap(), event);
        assert_eq!(*b.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_without_listeners_is_not_an_error() {
        let broadcaster = Broadcaster::new(8);
        let event = PropertyEvent::new(EventKind::EntityUpdated, PropertyRecord::new("p1"));
        assert_eq!(broadcaster.publish(event), 0);
    }

    #[test]
    fn wire_form_carries_timestamp() {
        let event = PropertyEvent::new(EventKind::EntityUpdated, PropertyRecord::new("p7"));
        match event.to_wire() {
            WireMessage::EntityUpdated { property, timestamp } => {
                assert_eq!(property.id, "p7");
                assert_eq!(timestamp, Some(event.timestamp));
            }
            other => panic!("unexpected frame {:?}", other),
        }
        assert!(event.id().starts_with("EntityUpdated-p7-"));
    }
}

//! Fixed-capacity store of the most recent notifications.

use std::collections::VecDeque;

use crate::notification::Notification;

/// Newest-first ring of accepted notifications.
///
/// `len() <= capacity` holds at every observable point: the oldest entry is
/// evicted before the new one is inserted.
#[derive(Debug)]
pub struct BoundedEventBuffer {
    capacity: usize,
    items: VecDeque<Notification>,
}

impl BoundedEventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, notification: Notification) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(notification);
    }

    /// Owned copy, newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use propwatch_shared::{EventKind, PropertyRecord};

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            kind: EventKind::NewEntity,
            entity: PropertyRecord::new(id),
            server_timestamp: Utc::now(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut buffer = BoundedEventBuffer::new(3);
        for i in 0..10 {
            buffer.push(notification(&format!("n{i}")));
            assert!(buffer.snapshot().len() <= 3);
        }
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn newest_first_and_oldest_evicted() {
        let mut buffer = BoundedEventBuffer::new(2);
        buffer.push(notification("a"));
        buffer.push(notification("b"));
        buffer.push(notification("c"));
        let ids: Vec<_> = buffer.snapshot().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut buffer = BoundedEventBuffer::new(2);
        buffer.push(notification("a"));
        let snap = buffer.snapshot();
        buffer.clear();
        assert_eq!(snap.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut buffer = BoundedEventBuffer::new(0);
        buffer.push(notification("a"));
        assert!(buffer.is_empty());
    }
}

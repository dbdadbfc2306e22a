//! Duplicate suppression over a bounded window of recent event ids.

use std::collections::{HashSet, VecDeque};

/// Remembers the last `horizon` accepted ids and rejects repeats.
///
/// Sized independently of the display buffer: a re-delivery right after a
/// reconnect can arrive after the original has already been evicted from the
/// buffer, and must still be recognised.
#[derive(Debug)]
pub struct Deduplicator {
    horizon: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            order: VecDeque::with_capacity(horizon),
            seen: HashSet::with_capacity(horizon),
        }
    }

    /// Returns true exactly once per id while it stays within the horizon.
    pub fn accept(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        while self.order.len() > self.horizon {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_are_rejected() {
        let mut dedup = Deduplicator::new(4);
        assert!(dedup.accept("a"));
        assert!(!dedup.accept("a"));
        assert!(dedup.accept("b"));
        assert!(!dedup.accept("a"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn oldest_id_falls_out_of_the_horizon() {
        let mut dedup = Deduplicator::new(2);
        assert!(dedup.accept("a"));
        assert!(dedup.accept("b"));
        assert!(dedup.accept("c"));
        assert_eq!(dedup.len(), 2);
        // "a" was evicted, "b" and "c" are still remembered
        assert!(!dedup.accept("b"));
        assert!(!dedup.accept("c"));
        assert!(dedup.accept("a"));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut dedup = Deduplicator::new(8);
        dedup.accept("a");
        dedup.clear();
        assert!(dedup.is_empty());
        assert!(dedup.accept("a"));
    }
}

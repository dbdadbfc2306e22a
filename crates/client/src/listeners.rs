//! Callback registries for notification and status observers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Handle returned by a callback registration; pass it back to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct Listeners<T> {
    entries: Vec<(ListenerId, Callback<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub fn insert(&mut self, id: ListenerId, callback: Callback<T>) {
        self.entries.push((id, callback));
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Call every listener in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn emit(&self, value: &T) {
        for (id, callback) in &self.entries {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::error!(listener = id.0, %message, "listener panicked");
            }
        }
    }
}

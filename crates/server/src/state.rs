//! Application state shared across request handlers.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::registry::SubscriptionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: SubscriptionRegistry,
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let broadcaster = Broadcaster::new(config.broadcast_capacity);
        Self {
            config: Arc::new(config),
            registry: SubscriptionRegistry::default(),
            broadcaster,
        }
    }
}

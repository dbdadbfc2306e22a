//! Registry of live connections and their last subscription filter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use propwatch_shared::{FilterCriteria, SubscriptionFilterSpec};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Public view of one connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    pub connection_id: Uuid,
    pub principal: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub filter: Option<FilterCriteria>,
}

struct Connection {
    principal: Option<String>,
    connected_at: DateTime<Utc>,
    filter: Option<SubscriptionFilterSpec>,
}

#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, Connection>>>,
}

impl SubscriptionRegistry {
    pub async fn register(&self, connection_id: Uuid, principal: Option<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(
            connection_id,
            Connection {
                principal,
                connected_at: Utc::now(),
                filter: None,
            },
        );
    }

    /// Record the connection's filter; `None` after an unsubscribe.
    pub async fn set_filter(&self, connection_id: Uuid, filter: Option<SubscriptionFilterSpec>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&connection_id) {
            connection.filter = filter;
        }
    }

    /// Returns true if the connection was known.
    pub async fn remove(&self, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        connections.remove(&connection_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot ordered by connect time.
    pub async fn list(&self) -> Vec<SubscriptionEntry> {
        let connections = self.connections.read().await;
        let mut entries: Vec<_> = connections
            .iter()
            .map(|(id, connection)| SubscriptionEntry {
                connection_id: *id,
                principal: connection.principal.clone(),
                connected_at: connection.connected_at,
                filter: connection
                    .filter
                    .as_ref()
                    .map(|spec| spec.criteria().clone()),
            })
            .collect();
        entries.sort_by_key(|entry| entry.connected_at);
        entries
    }
}

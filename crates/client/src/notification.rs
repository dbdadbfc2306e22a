//! The delivered notification value.

use chrono::{DateTime, Utc};
use propwatch_shared::{EventKind, PropertyRecord};

/// One accepted event, as handed to consumers.
///
/// Built once at decode time. Consumers only ever see shared references or
/// clones, so the value never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// `{type}-{entityId}-{serverTimestampMillis}`; the dedup key.
    pub id: String,
    pub kind: EventKind,
    pub entity: PropertyRecord,
    /// Timestamp assigned by the server when the event fired.
    pub server_timestamp: DateTime<Utc>,
    /// Client-observed arrival time; orders the recent-notification buffer.
    pub received_at: DateTime<Utc>,
}

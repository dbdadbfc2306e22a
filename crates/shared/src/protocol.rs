//! Wire protocol for the notification channel.
//!
//! Every frame is a small JSON object tagged by `type`:
//!
//! ```text
//! client -> server  {"type":"subscribe","payload":{...criteria}}
//! client -> server  {"type":"unsubscribe"}
//! client -> server  {"type":"ping"}
//! server -> client  {"type":"pong"}
//! server -> client  {"type":"NewEntity","property":{...},"timestamp":"..."}
//! server -> client  {"type":"EntityUpdated","property":{...},"timestamp":"..."}
//! ```
//!
//! Event frames from older producers may omit `timestamp`; the record's own
//! `updatedAt` / `createdAt` is used instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::FilterCriteria;
use crate::models::{EventKind, PropertyRecord};

/// Closed set of frames understood by either end of the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "subscribe")]
    Subscribe { payload: FilterCriteria },
    #[serde(rename = "unsubscribe")]
    Unsubscribe,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    NewEntity {
        property: PropertyRecord,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
    EntityUpdated {
        property: PropertyRecord,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
}

impl WireMessage {
    /// Build the server frame for a property event.
    pub fn event(kind: EventKind, property: PropertyRecord, timestamp: DateTime<Utc>) -> Self {
        match kind {
            EventKind::NewEntity => WireMessage::NewEntity {
                property,
                timestamp: Some(timestamp),
            },
            EventKind::EntityUpdated => WireMessage::EntityUpdated {
                property,
                timestamp: Some(timestamp),
            },
        }
    }

    /// Split an event frame into its parts. Control frames yield `None`.
    ///
    /// The timestamp is the frame's own, falling back to the record's
    /// [`PropertyRecord::event_timestamp`]; `None` when neither is present.
    pub fn into_event(self) -> Option<(EventKind, PropertyRecord, Option<DateTime<Utc>>)> {
        let (kind, property, timestamp) = match self {
            WireMessage::NewEntity {
                property,
                timestamp,
            } => (EventKind::NewEntity, property, timestamp),
            WireMessage::EntityUpdated {
                property,
                timestamp,
            } => (EventKind::EntityUpdated, property, timestamp),
            _ => return None,
        };
        let timestamp = timestamp.or_else(|| property.event_timestamp());
        Some((kind, property, timestamp))
    }
}

/// Stable identity of a server event: `{type}-{entityId}-{timestampMillis}`.
///
/// Derived from the server timestamp so that a re-delivery of the same event
/// always maps to the same id, whenever it arrives.
pub fn event_id(kind: EventKind, entity_id: &str, timestamp: DateTime<Utc>) -> String {
    format!("{}-{}-{}", kind, entity_id, timestamp.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn control_frames_use_lowercase_tags() {
        assert_eq!(
            serde_json::to_string(&WireMessage::Unsubscribe).unwrap(),
            r#"{"type":"unsubscribe"}"#
        );
        assert_eq!(
            serde_json::to_string(&WireMessage::Ping).unwrap(),
            r#"{"type":"ping"}"#
        );
    }

    #[test]
    fn subscribe_payload_omits_absent_criteria() {
        let msg = WireMessage::Subscribe {
            payload: FilterCriteria {
                location: Some("Seattle".into()),
                min_price: Some(100.0),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "subscribe",
                "payload": {"location": "Seattle", "minPrice": 100.0}
            })
        );
    }

    #[test]
    fn event_frames_parse() {
        let text = r#"{"type":"EntityUpdated","property":{"id":"p9","price":10},"timestamp":"2024-03-01T12:00:00Z"}"#;
        let msg: WireMessage = serde_json::from_str(text).unwrap();
        let (kind, property, ts) = msg.into_event().unwrap();
        assert_eq!(kind, EventKind::EntityUpdated);
        assert_eq!(property.id, "p9");
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn missing_timestamp_falls_back_to_record() {
        let text = r#"{"type":"EntityUpdated","property":{"id":"p9","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-03-02T08:30:00Z"}}"#;
        let msg: WireMessage = serde_json::from_str(text).unwrap();
        let (_, _, ts) = msg.into_event().unwrap();
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap()));

        let bare: WireMessage =
            serde_json::from_str(r#"{"type":"NewEntity","property":{"id":"p9"}}"#).unwrap();
        assert_eq!(bare.into_event().unwrap().2, None);
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(serde_json::from_str::<WireMessage>(r#"{"type":"Deleted","property":{"id":"1"}}"#).is_err());
    }

    #[test]
    fn event_id_uses_server_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            event_id(EventKind::NewEntity, "p1", ts),
            format!("NewEntity-p1-{}", ts.timestamp_millis())
        );
    }
}

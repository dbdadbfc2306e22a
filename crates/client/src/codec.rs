//! Encoding and decoding of wire frames.

use chrono::{DateTime, Utc};
use propwatch_shared::{event_id, WireMessage};

use crate::error::CodecError;
use crate::notification::Notification;

/// A successfully decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(Notification),
    /// `ping` / `pong`; carries no data beyond liveness.
    Control,
}

pub struct EventCodec;

impl EventCodec {
    pub fn encode(message: &WireMessage) -> Result<String, serde_json::Error> {
        serde_json::to_string(message)
    }

    /// Decode a server frame, stamping events with the local arrival time.
    pub fn decode(text: &str, received_at: DateTime<Utc>) -> Result<Inbound, CodecError> {
        match serde_json::from_str::<WireMessage>(text)? {
            WireMessage::Ping | WireMessage::Pong => Ok(Inbound::Control),
            WireMessage::Subscribe { .. } => Err(CodecError::UnexpectedDirection("subscribe")),
            WireMessage::Unsubscribe => Err(CodecError::UnexpectedDirection("unsubscribe")),
            event => {
                let Some((kind, entity, server_timestamp)) = event.into_event() else {
                    return Ok(Inbound::Control);
                };
                if entity.id.trim().is_empty() {
                    return Err(CodecError::MissingEntityId);
                }
                // Arrival time would give a re-delivery a fresh id.
                let server_timestamp = server_timestamp.ok_or(CodecError::MissingTimestamp)?;
                Ok(Inbound::Event(Notification {
                    id: event_id(kind, &entity.id, server_timestamp),
                    kind,
                    entity,
                    server_timestamp,
                    received_at,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use propwatch_shared::EventKind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn decodes_new_entity() {
        let text = r#"{"type":"NewEntity","property":{"id":"p1","location":"Seattle","price":450000},"timestamp":"2025-06-01T07:59:58Z"}"#;
        let Inbound::Event(n) = EventCodec::decode(text, now()).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(n.kind, EventKind::NewEntity);
        assert_eq!(n.entity.location.as_deref(), Some("Seattle"));
        assert_eq!(n.received_at, now());
        assert!(n.id.starts_with("NewEntity-p1-"));
    }

    #[test]
    fn same_event_gets_same_id_regardless_of_arrival() {
        let text = r#"{"type":"EntityUpdated","property":{"id":"p1"},"timestamp":"2025-06-01T07:00:00Z"}"#;
        let a = EventCodec::decode(text, now()).unwrap();
        let b = EventCodec::decode(text, now() + chrono::Duration::seconds(90)).unwrap();
        match (a, b) {
            (Inbound::Event(a), Inbound::Event(b)) => assert_eq!(a.id, b.id),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pong_is_control() {
        assert_eq!(
            EventCodec::decode(r#"{"type":"pong"}"#, now()).unwrap(),
            Inbound::Control
        );
    }

    #[test]
    fn rejects_garbage_and_unknown_types() {
        assert!(matches!(
            EventCodec::decode("{not json", now()),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            EventCodec::decode(r#"{"type":"Deleted","property":{"id":"p"}}"#, now()),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_client_bound_frames() {
        assert!(matches!(
            EventCodec::decode(r#"{"type":"unsubscribe"}"#, now()),
            Err(CodecError::UnexpectedDirection("unsubscribe"))
        ));
    }

    #[test]
    fn rejects_blank_entity_id() {
        let text = r#"{"type":"NewEntity","property":{"id":"  "},"timestamp":"2025-06-01T07:00:00Z"}"#;
        assert!(matches!(
            EventCodec::decode(text, now()),
            Err(CodecError::MissingEntityId)
        ));
    }

    #[test]
    fn untimestamped_frame_uses_record_change_time() {
        let text = r#"{"type":"NewEntity","property":{"id":7,"updatedAt":"2025-06-01T07:00:00Z"}}"#;
        let Inbound::Event(n) = EventCodec::decode(text, now()).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(n.server_timestamp, Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap());
        assert_eq!(n.id, format!("NewEntity-7-{}", n.server_timestamp.timestamp_millis()));

        assert!(matches!(
            EventCodec::decode(r#"{"type":"NewEntity","property":{"id":7}}"#, now()),
            Err(CodecError::MissingTimestamp)
        ));
    }

    #[test]
    fn encodes_ping() {
        assert_eq!(EventCodec::encode(&WireMessage::Ping).unwrap(), r#"{"type":"ping"}"#);
    }
}

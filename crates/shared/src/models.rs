//! Shared data models for property events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The kind of domain event carried by a server frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewEntity,
    EntityUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewEntity => "NewEntity",
            EventKind::EntityUpdated => "EntityUpdated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial property listing as carried on the wire.
///
/// Only `id` is mandatory. Every other field may be absent, and fields this
/// model does not know about are kept in `extra` untouched. Numeric fields take
/// any JSON number (or numeric string); anything else reads as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bedrooms: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bathrooms: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PropertyRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The record's own change time: `updatedAt`, else `createdAt` (RFC3339).
    pub fn event_timestamp(&self) -> Option<DateTime<Utc>> {
        ["updatedAt", "createdAt"].iter().find_map(|key| {
            let raw = self.extra.get(*key)?.as_str()?;
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        })
    }
}

/// Entity ids are produced by more than one backend; accept `"42"` and `42` alike.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

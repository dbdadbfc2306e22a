//! Error types for the notification core.

use propwatch_shared::FilterError;

/// Failure to open or keep a transport connection.
///
/// Always recovered locally through the reconnect schedule; never surfaced
/// to callers of [`crate::NotificationService`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("connection attempt timed out")]
    Timeout,
    #[error("connection closed: {0}")]
    Closed(String),
}

/// An inbound frame that could not be turned into an event.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unexpected client-bound frame of type {0}")]
    UnexpectedDirection(&'static str),
    #[error("event is missing an entity id")]
    MissingEntityId,
    #[error("event carries no timestamp")]
    MissingTimestamp,
}

/// Errors returned to callers of the public API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),
    #[error("no authenticated principal")]
    NotAuthenticated,
    #[error("notification service has stopped")]
    ServiceStopped,
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?}")]
    Parse { name: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

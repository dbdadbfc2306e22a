//! Event publishing endpoint for the server-side producer.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use propwatch_shared::{EventKind, ProblemDetails, PropertyRecord};
use serde::{Deserialize, Serialize};

use super::ApiProblem;
use crate::broadcast::{EventPublisher, PropertyEvent};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub property: PropertyRecord,
    /// Defaults to the time the server received the request.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishResponse {
    pub id: String,
    pub delivered: usize,
}

/// POST /api/events
pub async fn publish_event(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiProblem> {
    let Json(request) =
        payload.map_err(|e| ApiProblem(ProblemDetails::bad_request(e.body_text())))?;

    if request.property.id.trim().is_empty() {
        return Err(ApiProblem(ProblemDetails::unprocessable(
            "property.id must not be empty",
        )));
    }

    let event = PropertyEvent {
        kind: request.kind,
        property: request.property,
        timestamp: request.timestamp.unwrap_or_else(Utc::now),
    };
    let id = event.id();
    let delivered = state.broadcaster.publish(event);
    tracing::info!(%id, delivered, "event accepted");

    Ok((StatusCode::ACCEPTED, Json(PublishResponse { id, delivered })))
}

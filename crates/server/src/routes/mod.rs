pub mod events;
pub mod subscriptions;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use propwatch_shared::ProblemDetails;

/// A `ProblemDetails` body rendered as `application/problem+json`.
#[derive(Debug)]
pub struct ApiProblem(pub ProblemDetails);

impl IntoResponse for ApiProblem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self.0),
        )
            .into_response()
    }
}

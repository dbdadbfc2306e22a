//! Shared error types including RFC7807 Problem Details.

use serde::{Deserialize, Serialize};

/// A subscription filter that violates its own invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid price range: minPrice {min} is greater than maxPrice {max}")]
    InvalidPriceRange { min: f64, max: f64 },
    #[error("invalid filter: {field} must be a finite number, got {value}")]
    NonFiniteBound { field: &'static str, value: f64 },
}

/// RFC7807 Problem Details (application/problem+json)
///
/// Canonical error envelope for the server's `/api/*` endpoints so producers
/// can see why a published event was rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProblemDetails {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            type_url: "https://propwatch.dev/problems/bad-request".to_string(),
            title: "Bad Request".to_string(),
            status: 400,
            detail: Some(detail.into()),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            type_url: "https://propwatch.dev/problems/unprocessable-entity".to_string(),
            title: "Unprocessable Entity".to_string(),
            status: 422,
            detail: Some(detail.into()),
        }
    }
}

/// Attempt to parse a Problem Details body into a user-facing message.
/// Prefers `detail`, falls back to `title`.
pub fn try_problem_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ProblemDetails>(body).ok()?;
    if let Some(detail) = parsed.detail {
        if !detail.trim().is_empty() {
            return Some(detail);
        }
    }
    if !parsed.title.trim().is_empty() {
        return Some(parsed.title);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_detail_prefers_detail() {
        let body = serde_json::to_string(&ProblemDetails::bad_request("empty id")).unwrap();
        assert_eq!(try_problem_detail(&body).as_deref(), Some("empty id"));
        assert_eq!(try_problem_detail("not json"), None);
    }
}

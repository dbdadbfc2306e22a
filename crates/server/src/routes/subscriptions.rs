use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::registry::SubscriptionEntry;
use crate::state::AppState;

/// GET /api/subscriptions
pub async fn list_subscriptions(State(state): State<AppState>) -> Json<Vec<SubscriptionEntry>> {
    Json(state.registry.list().await)
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.registry.len().await,
    }))
}

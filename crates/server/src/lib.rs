//! Propwatch Server - property event broadcast
//!
//! Accepts WebSocket subscribers, tracks their filters, and fans published
//! property events out to them.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod broadcast;
pub mod config;
pub mod registry;
pub mod routes;
pub mod state;
pub mod ws;

pub use broadcast::{Broadcaster, EventPublisher, PropertyEvent};
pub use config::{DispatchMode, ServerConfig};
pub use state::AppState;

/// Build the router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::subscriptions::health))
        .route("/api/events", post(routes::events::publish_event))
        .route("/api/subscriptions", get(routes::subscriptions::list_subscriptions))
        // WebSocket
        .route("/api/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

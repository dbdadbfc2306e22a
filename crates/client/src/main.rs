//! Propwatch client - tails a notification server and logs matching listings.
//!
//! Environment variables:
//! - `PROPWATCH_URL`: WebSocket endpoint (default: "ws://localhost:8080/api/ws")
//! - `PROPWATCH_PRINCIPAL`: principal id (default: "anonymous")
//! - `PROPWATCH_TOKEN`: optional bearer token passed to the server
//! - `PROPWATCH_FILTER`: subscription criteria as JSON (default: match everything)
//! - plus the tuning variables read by `NotificationConfig::from_env`

use std::sync::Arc;

use anyhow::Context;
use propwatch_client::{NotificationConfig, NotificationService, Principal, WebSocketTransport};
use propwatch_shared::FilterCriteria;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propwatch_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NotificationConfig::from_env()?;
    let url = std::env::var("PROPWATCH_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/api/ws".to_string());
    let transport = WebSocketTransport::new(&url).with_context(|| format!("invalid URL {url}"))?;

    let mut principal = Principal::new(
        std::env::var("PROPWATCH_PRINCIPAL").unwrap_or_else(|_| "anonymous".to_string()),
    );
    if let Ok(token) = std::env::var("PROPWATCH_TOKEN") {
        principal = principal.with_token(token);
    }

    let criteria: FilterCriteria = match std::env::var("PROPWATCH_FILTER") {
        Ok(json) => serde_json::from_str(&json).context("PROPWATCH_FILTER is not valid criteria")?,
        Err(_) => FilterCriteria::default(),
    };

    let service = NotificationService::new(config, Arc::new(transport));
    service.on_status_change(|state| tracing::info!(?state, "connection status"));
    let mut live = service.notifications();

    service.activate(principal)?;
    service.subscribe(criteria).await?;
    tracing::info!(%url, "watching for listings");

    loop {
        tokio::select! {
            received = live.recv() => match received {
                Ok(n) => tracing::info!(
                    kind = %n.kind,
                    id = %n.entity.id,
                    location = n.entity.location.as_deref().unwrap_or("-"),
                    price = ?n.entity.price,
                    "listing"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "fell behind the notification stream");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

//! WebSocket handler for the notification channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use propwatch_shared::{SubscriptionFilterSpec, WireMessage};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::broadcast::PropertyEvent;
use crate::config::DispatchMode;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub principal: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::info!(principal = ?params.principal, "WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, params.principal, state))
}

/// Whether an event should be forwarded to a connection.
pub fn should_deliver(
    mode: DispatchMode,
    filter: Option<&SubscriptionFilterSpec>,
    event: &PropertyEvent,
) -> bool {
    match mode {
        DispatchMode::Unfiltered => true,
        DispatchMode::Filtered => filter.is_some_and(|spec| spec.matches(&event.property)),
    }
}

async fn handle_socket(socket: WebSocket, principal: Option<String>, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();

    state.registry.register(conn_id, principal.clone()).await;
    let mut events = state.broadcaster.subscribe();
    let mut filter: Option<SubscriptionFilterSpec> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply =
                        handle_client_frame(text.as_str(), conn_id, &mut filter, &state).await;
                    if let Some(reply) = reply {
                        if !send_frame(&mut sender, &reply).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "WebSocket read error");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if should_deliver(state.config.dispatch, filter.as_ref(), &event)
                        && !send_frame(&mut sender, &event.to_wire()).await
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%conn_id, skipped, "connection fell behind the event stream");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    state.registry.remove(conn_id).await;
    tracing::info!(%conn_id, principal = ?principal, "WebSocket connection closed");
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &WireMessage,
) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode frame");
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

/// Apply one client frame; returns the reply to send, if any.
async fn handle_client_frame(
    text: &str,
    conn_id: Uuid,
    filter: &mut Option<SubscriptionFilterSpec>,
    state: &AppState,
) -> Option<WireMessage> {
    let frame = match serde_json::from_str::<WireMessage>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "ignoring malformed client frame");
            return None;
        }
    };

    match frame {
        WireMessage::Ping => Some(WireMessage::Pong),
        WireMessage::Subscribe { payload } => {
            match SubscriptionFilterSpec::new(payload) {
                Ok(spec) => {
                    tracing::debug!(%conn_id, criteria = ?spec.criteria(), "subscribed");
                    *filter = Some(spec.clone());
                    state.registry.set_filter(conn_id, Some(spec)).await;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "rejecting subscription, keeping previous filter");
                }
            }
            None
        }
        WireMessage::Unsubscribe => {
            tracing::debug!(%conn_id, "unsubscribed");
            *filter = None;
            state.registry.set_filter(conn_id, None).await;
            None
        }
        WireMessage::Pong => None,
        WireMessage::NewEntity { .. } | WireMessage::EntityUpdated { .. } => {
            tracing::warn!(%conn_id, "clients may not publish events over the socket");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propwatch_shared::{EventKind, FilterCriteria, PropertyRecord};

    fn event_in(location: &str) -> PropertyEvent {
        let mut property = PropertyRecord::new("p1");
        property.location = Some(location.to_string());
        PropertyEvent::new(EventKind::NewEntity, property)
    }

    #[test]
    fn unfiltered_mode_delivers_everything() {
        assert!(should_deliver(DispatchMode::Unfiltered, None, &event_in("Boise")));
    }

    #[test]
    fn filtered_mode_needs_a_matching_filter() {
        let spec = SubscriptionFilterSpec::new(FilterCriteria::default().location("boise")).unwrap();
        assert!(should_deliver(DispatchMode::Filtered, Some(&spec), &event_in("Boise, ID")));
        assert!(!should_deliver(DispatchMode::Filtered, Some(&spec), &event_in("Reno")));
        assert!(!should_deliver(DispatchMode::Filtered, None, &event_in("Boise")));
    }
}

//! In-memory transport for driving `NotificationService` in tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use propwatch_client::{
    ConnectionState, NotificationConfig, NotificationService, Principal, Transport,
    TransportError, TransportLink,
};
use propwatch_shared::WireMessage;
use tokio::sync::mpsc;

/// The server side of one opened link.
pub struct MockServerEnd {
    pub to_client: UnboundedSender<String>,
    pub from_client: UnboundedReceiver<String>,
}

impl MockServerEnd {
    pub fn push(&self, frame: impl Into<String>) {
        self.to_client
            .unbounded_send(frame.into())
            .expect("client side of the link is gone");
    }

    /// Next frame sent by the client, decoded. `None` once the client closed.
    pub async fn next_message(&mut self) -> Option<WireMessage> {
        let text = self.from_client.next().await?;
        Some(serde_json::from_str(&text).expect("client sent invalid JSON"))
    }

    /// Next non-ping frame sent by the client.
    pub async fn next_command(&mut self) -> Option<WireMessage> {
        loop {
            match self.next_message().await? {
                WireMessage::Ping => continue,
                other => return Some(other),
            }
        }
    }
}

#[derive(Default)]
struct MockState {
    opens: u32,
    failures_remaining: u32,
    always_fail: bool,
    open_delay: Duration,
}

pub struct MockTransport {
    state: Mutex<MockState>,
    accepted: mpsc::UnboundedSender<MockServerEnd>,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockServerEnd>) {
        let (accepted, links) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            state: Mutex::new(MockState::default()),
            accepted,
        });
        (transport, links)
    }

    pub fn fail_next(&self, count: u32) {
        self.state.lock().unwrap().failures_remaining = count;
    }

    pub fn always_fail(&self, fail: bool) {
        self.state.lock().unwrap().always_fail = fail;
    }

    pub fn delay_opens(&self, delay: Duration) {
        self.state.lock().unwrap().open_delay = delay;
    }

    pub fn opens(&self) -> u32 {
        self.state.lock().unwrap().opens
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _principal: &Principal) -> Result<TransportLink, TransportError> {
        let (delay, fail) = {
            let mut state = self.state.lock().unwrap();
            state.opens += 1;
            let fail = if state.always_fail {
                true
            } else if state.failures_remaining > 0 {
                state.failures_remaining -= 1;
                true
            } else {
                false
            };
            (state.open_delay, fail)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(TransportError::Connect("connection refused".into()));
        }

        let (outbound, from_client) = unbounded();
        let (to_client, inbound) = unbounded();
        let _ = self.accepted.send(MockServerEnd {
            to_client,
            from_client,
        });
        Ok(TransportLink { outbound, inbound })
    }
}

pub struct Harness {
    pub service: NotificationService,
    pub transport: Arc<MockTransport>,
    pub links: mpsc::UnboundedReceiver<MockServerEnd>,
    pub statuses: Arc<Mutex<Vec<ConnectionState>>>,
}

impl Harness {
    pub fn new(config: NotificationConfig) -> Self {
        let (transport, links) = MockTransport::new();
        let service = NotificationService::new(config, transport.clone());
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = statuses.clone();
        service.on_status_change(move |state| sink.lock().unwrap().push(*state));
        Self {
            service,
            transport,
            links,
            statuses,
        }
    }

    pub async fn next_link(&mut self) -> MockServerEnd {
        self.links.recv().await.expect("transport dropped")
    }

    pub fn statuses(&self) -> Vec<ConnectionState> {
        self.statuses.lock().unwrap().clone()
    }
}

pub fn alice() -> Principal {
    Principal::new("alice")
}

/// Let every ready task run. Under a paused clock the runtime only advances
/// time once all tasks are idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn event_frame(
    kind: &str,
    id: &str,
    location: &str,
    price: f64,
    property_type: &str,
    timestamp: &str,
) -> String {
    serde_json::json!({
        "type": kind,
        "property": {
            "id": id,
            "location": location,
            "price": price,
            "propertyType": property_type,
        },
        "timestamp": timestamp,
    })
    .to_string()
}

pub fn listing(id: &str, location: &str, timestamp: &str) -> String {
    event_frame("NewEntity", id, location, 450_000.0, "house", timestamp)
}

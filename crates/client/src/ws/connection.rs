//! A single managed connection with state tracking and auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc::UnboundedSender as LinkSender;
use futures_util::StreamExt;
use propwatch_shared::WireMessage;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::heartbeat::{HeartbeatMonitor, Liveness};
use super::reconnect::ReconnectScheduler;
use super::scheduler::ScheduledTask;
use super::transport::{Transport, TransportLink};
use crate::codec::EventCodec;
use crate::config::NotificationConfig;
use crate::error::TransportError;
use crate::listeners::{Callback, ListenerId, Listeners};
use crate::session::Principal;

/// Connection state for the notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }
}

/// Reports from spawned tasks back to the manager, tagged with the
/// generation they were started under.
pub(crate) enum ConnectionEvent {
    Opened {
        generation: u64,
        result: Result<TransportLink, TransportError>,
    },
    Frame {
        generation: u64,
        text: String,
    },
    Closed {
        generation: u64,
    },
    HeartbeatTick {
        generation: u64,
    },
    LivenessDue {
        generation: u64,
    },
    ReconnectDue {
        generation: u64,
    },
}

/// The open link plus the task pumping its inbound side.
struct ActiveLink {
    outbound: LinkSender<String>,
    reader: JoinHandle<()>,
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Owns one logical transport connection and drives [`ConnectionState`].
///
/// All methods run on the owning driver task. Work that has to wait (opening,
/// reading, timers) is spawned and reports back as a [`ConnectionEvent`].
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    principal: Option<Principal>,
    connect_timeout: Duration,
    state: ConnectionState,
    generation: u64,
    link: Option<ActiveLink>,
    attempt: Option<JoinHandle<()>>,
    pending_reconnect: Option<ScheduledTask>,
    reconnect: ReconnectScheduler,
    heartbeat: HeartbeatMonitor,
    subscription: Option<WireMessage>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    status: watch::Sender<ConnectionState>,
    status_listeners: Listeners<ConnectionState>,
}

impl ConnectionManager {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        config: &NotificationConfig,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        status: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            transport,
            principal: None,
            connect_timeout: config.connect_timeout,
            state: ConnectionState::Disconnected,
            generation: 0,
            link: None,
            attempt: None,
            pending_reconnect: None,
            reconnect: ReconnectScheduler::new(config.reconnect.clone()),
            heartbeat: HeartbeatMonitor::new(config.ping_interval),
            subscription: None,
            events,
            status,
            status_listeners: Listeners::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// When inbound traffic was last seen on the current connection.
    pub fn last_traffic_at(&self) -> Option<Instant> {
        if self.state.is_connected() {
            self.heartbeat.last_traffic_at()
        } else {
            None
        }
    }

    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// The message re-sent on every successful connect, if any.
    pub fn set_subscription(&mut self, message: Option<WireMessage>) {
        self.subscription = message;
    }

    pub(crate) fn on_status_change(&mut self, id: ListenerId, callback: Callback<ConnectionState>) {
        self.status_listeners.insert(id, callback);
    }

    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.status_listeners.remove(id)
    }

    /// Start connecting unless already connecting or connected.
    ///
    /// A pending reconnect is superseded by the immediate attempt.
    pub fn connect(&mut self) {
        if self.state.is_connected() || self.state.is_connecting() {
            return;
        }
        self.pending_reconnect = None;
        self.start_attempt();
    }

    /// Send a frame on the current connection.
    ///
    /// Never blocks. Returns false (after logging) when not connected or the
    /// transport refuses the frame.
    pub fn send(&mut self, message: &WireMessage) -> bool {
        if !self.state.is_connected() {
            tracing::debug!(?message, state = ?self.state, "not connected, dropping outbound frame");
            return false;
        }
        let Some(link) = &self.link else {
            return false;
        };
        let text = match EventCodec::encode(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound frame");
                return false;
            }
        };
        if let Err(e) = link.outbound.unbounded_send(text) {
            tracing::warn!(error = %e, "transport rejected outbound frame");
            return false;
        }
        true
    }

    /// Caller-initiated close. Cancels every timer and any in-flight attempt,
    /// and does not schedule a reconnect.
    pub fn close(&mut self) {
        self.pending_reconnect = None;
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
        self.generation += 1;

        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Closing);
        self.heartbeat.stop();
        self.link = None;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("connection closed by caller");
    }

    /// Apply an event from a spawned task. Returns the text of an inbound
    /// frame that belongs to the live connection.
    pub(crate) fn handle_event(&mut self, event: ConnectionEvent) -> Option<String> {
        match event {
            ConnectionEvent::Opened { generation, result } => {
                if generation != self.generation || !self.state.is_connecting() {
                    tracing::debug!(generation, "discarding superseded connection attempt");
                    return None;
                }
                self.attempt = None;
                match result {
                    Ok(link) => self.on_open(link),
                    Err(e) => {
                        tracing::warn!(error = %e, "connection attempt failed");
                        self.set_state(ConnectionState::Disconnected);
                        self.schedule_reconnect();
                    }
                }
                None
            }
            ConnectionEvent::Frame { generation, text } => {
                if generation != self.generation || !self.state.is_connected() {
                    return None;
                }
                self.heartbeat.record_traffic();
                Some(text)
            }
            ConnectionEvent::Closed { generation } => {
                if generation == self.generation && self.state.is_connected() {
                    tracing::warn!("transport closed unexpectedly");
                    self.drop_connection();
                    self.schedule_reconnect();
                }
                None
            }
            ConnectionEvent::HeartbeatTick { generation } => {
                if generation != self.generation || !self.state.is_connected() {
                    return None;
                }
                self.send(&WireMessage::Ping);
                None
            }
            ConnectionEvent::LivenessDue { generation } => {
                if generation != self.generation || !self.state.is_connected() {
                    return None;
                }
                match self.heartbeat.check(Instant::now()) {
                    Liveness::Alive => self.arm_liveness_deadline(),
                    Liveness::Stale { silent_for } => {
                        tracing::warn!(?silent_for, "connection is stale, forcing reconnect");
                        self.drop_connection();
                        self.schedule_reconnect();
                    }
                }
                None
            }
            ConnectionEvent::ReconnectDue { generation } => {
                if generation == self.generation
                    && self.state == ConnectionState::Disconnected
                    && self.pending_reconnect.take().is_some()
                {
                    tracing::info!(attempt = self.reconnect.attempts(), "reconnecting");
                    self.start_attempt();
                }
                None
            }
        }
    }

    fn start_attempt(&mut self) {
        let Some(principal) = self.principal.clone() else {
            tracing::warn!("connect requested without a principal");
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        self.set_state(ConnectionState::Connecting);

        let transport = self.transport.clone();
        let events = self.events.clone();
        let timeout = self.connect_timeout;
        self.attempt = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, transport.open(&principal)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            };
            let _ = events.send(ConnectionEvent::Opened { generation, result });
        }));
    }

    fn on_open(&mut self, link: TransportLink) {
        let generation = self.generation;
        self.set_state(ConnectionState::Connected);
        self.reconnect.reset();

        let TransportLink {
            outbound,
            mut inbound,
        } = link;
        let events = self.events.clone();
        let reader = tokio::spawn(async move {
            while let Some(text) = inbound.next().await {
                if events
                    .send(ConnectionEvent::Frame { generation, text })
                    .is_err()
                {
                    return;
                }
            }
            let _ = events.send(ConnectionEvent::Closed { generation });
        });
        self.link = Some(ActiveLink { outbound, reader });

        self.heartbeat
            .start(self.events.clone(), move || ConnectionEvent::HeartbeatTick {
                generation,
            });
        self.arm_liveness_deadline();
        tracing::info!(generation, "connected");

        if let Some(message) = self.subscription.clone() {
            self.send(&message);
        }
    }

    /// Traffic only moves the deadline later, so the timer is re-armed lazily
    /// when it fires rather than on every frame.
    fn arm_liveness_deadline(&mut self) {
        self.heartbeat.arm_deadline(
            self.events.clone(),
            ConnectionEvent::LivenessDue {
                generation: self.generation,
            },
        );
    }

    /// Tear down the live link after a transport-level failure.
    fn drop_connection(&mut self) {
        self.heartbeat.stop();
        self.link = None;
        self.generation += 1;
        self.set_state(ConnectionState::Disconnected);
    }

    fn schedule_reconnect(&mut self) {
        match self.reconnect.next_delay() {
            Some(delay) => {
                tracing::info!(
                    ?delay,
                    attempt = self.reconnect.attempts(),
                    "scheduling reconnect"
                );
                self.pending_reconnect = Some(ScheduledTask::once(
                    delay,
                    self.events.clone(),
                    ConnectionEvent::ReconnectDue {
                        generation: self.generation,
                    },
                ));
            }
            None => {
                tracing::error!(
                    attempts = self.reconnect.attempts(),
                    "reconnect attempts exhausted, staying disconnected"
                );
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?state, "connection state changed");
        self.state = state;
        self.status.send_replace(state);
        self.status_listeners.emit(&state);
    }
}

//! The public notification API and the driver task behind it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use propwatch_shared::{FilterCriteria, SubscriptionFilterSpec, WireMessage};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::buffer::BoundedEventBuffer;
use crate::codec::{EventCodec, Inbound};
use crate::config::NotificationConfig;
use crate::dedup::Deduplicator;
use crate::error::NotificationError;
use crate::filter::ActiveFilter;
use crate::listeners::{Callback, ListenerId, Listeners};
use crate::notification::Notification;
use crate::session::Principal;
use crate::ws::{ConnectionEvent, ConnectionManager, ConnectionState, Transport};

enum Command {
    Activate(Principal),
    Deactivate,
    Subscribe {
        filter: SubscriptionFilterSpec,
        reply: oneshot::Sender<Result<(), NotificationError>>,
    },
    Unsubscribe {
        reply: oneshot::Sender<()>,
    },
    Recent {
        reply: oneshot::Sender<Vec<Notification>>,
    },
    CurrentFilter {
        reply: oneshot::Sender<Option<SubscriptionFilterSpec>>,
    },
    LastTraffic {
        reply: oneshot::Sender<Option<Instant>>,
    },
    OnNotification(ListenerId, Callback<Notification>),
    OnStatusChange(ListenerId, Callback<ConnectionState>),
    RemoveListener(ListenerId),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to one notification channel.
///
/// Every operation is queued onto a single driver task, which owns the
/// connection, the active filter, the dedup window and the recent buffer.
/// Clones share the same driver; it stops when the last clone is dropped or
/// [`NotificationService::shutdown`] is called.
#[derive(Clone)]
pub struct NotificationService {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionState>,
    live: broadcast::Sender<Notification>,
    next_listener: Arc<AtomicU64>,
}

impl NotificationService {
    /// Spawn the driver in the idle state (no principal, not connected).
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: NotificationConfig, transport: Arc<dyn Transport>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionState::Disconnected);
        let (live, _) = broadcast::channel(config.buffer_capacity.max(16));

        let driver = Driver {
            manager: ConnectionManager::new(transport, &config, events, status_tx),
            principal: None,
            filter: ActiveFilter::NoActiveFilter,
            dedup: Deduplicator::new(config.dedup_horizon),
            buffer: BoundedEventBuffer::new(config.buffer_capacity),
            listeners: Listeners::default(),
            live: live.clone(),
        };
        tokio::spawn(driver.run(command_rx, event_rx));

        Self {
            commands,
            status,
            live,
            next_listener: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Bind to an authenticated principal and start connecting.
    ///
    /// Activating with a different principal tears the previous session down
    /// first.
    pub fn activate(&self, principal: Principal) -> Result<(), NotificationError> {
        self.send(Command::Activate(principal))
    }

    /// End the session: close the transport, cancel timers, and forget the
    /// filter, the recent buffer and the dedup window.
    pub fn deactivate(&self) -> Result<(), NotificationError> {
        self.send(Command::Deactivate)
    }

    /// Validate and install a filter, connecting if needed.
    ///
    /// An invalid filter is rejected here and leaves the previous one active.
    pub async fn subscribe(&self, criteria: FilterCriteria) -> Result<(), NotificationError> {
        let filter = SubscriptionFilterSpec::new(criteria)?;
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { filter, reply })?;
        rx.await.map_err(|_| NotificationError::ServiceStopped)?
    }

    /// Drop the active filter. The connection stays open.
    pub async fn unsubscribe(&self) -> Result<(), NotificationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unsubscribe { reply })?;
        rx.await.map_err(|_| NotificationError::ServiceStopped)
    }

    pub async fn active_filter(&self) -> Result<Option<SubscriptionFilterSpec>, NotificationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CurrentFilter { reply })?;
        rx.await.map_err(|_| NotificationError::ServiceStopped)
    }

    /// Recently accepted notifications, newest first.
    pub async fn recent_notifications(&self) -> Result<Vec<Notification>, NotificationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Recent { reply })?;
        rx.await.map_err(|_| NotificationError::ServiceStopped)
    }

    /// When inbound traffic (data or pong) was last seen on the live
    /// connection. `None` while not connected.
    pub async fn last_traffic_at(&self) -> Result<Option<Instant>, NotificationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LastTraffic { reply })?;
        rx.await.map_err(|_| NotificationError::ServiceStopped)
    }

    pub fn connection_status(&self) -> ConnectionState {
        *self.status.borrow()
    }

    /// Latest-value view of the connection status.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionState> {
        self.status.clone()
    }

    /// Live stream of accepted notifications.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.live.subscribe()
    }

    /// Call `callback` for every accepted notification, in wire order.
    pub fn on_notification(
        &self,
        callback: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.listener_id();
        let _ = self.send(Command::OnNotification(id, Arc::new(callback)));
        id
    }

    /// Call `callback` on every connection state transition.
    pub fn on_status_change(
        &self,
        callback: impl Fn(&ConnectionState) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.listener_id();
        let _ = self.send(Command::OnStatusChange(id, Arc::new(callback)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        let _ = self.send(Command::RemoveListener(id));
    }

    /// Tear everything down and wait for the driver to stop.
    pub async fn shutdown(self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    fn listener_id(&self) -> ListenerId {
        ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, command: Command) -> Result<(), NotificationError> {
        self.commands
            .send(command)
            .map_err(|_| NotificationError::ServiceStopped)
    }
}

struct Driver {
    manager: ConnectionManager,
    principal: Option<Principal>,
    filter: ActiveFilter,
    dedup: Deduplicator,
    buffer: BoundedEventBuffer,
    listeners: Listeners<Notification>,
    live: broadcast::Sender<Notification>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if let Command::Shutdown { reply } = command {
                        self.end_session();
                        let _ = reply.send(());
                        return;
                    }
                    self.handle_command(command);
                }
                Some(event) = events.recv() => {
                    if let Some(text) = self.manager.handle_event(event) {
                        self.on_frame(&text);
                    }
                }
            }
        }
        self.end_session();
        tracing::debug!("notification service stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Activate(principal) => {
                if self.principal.as_ref() == Some(&principal) {
                    return;
                }
                if self.principal.is_some() {
                    self.end_session();
                }
                tracing::info!(principal = %principal.id, "session started");
                self.manager.set_principal(Some(principal.clone()));
                self.principal = Some(principal);
                self.manager.connect();
            }
            Command::Deactivate => self.end_session(),
            Command::Subscribe { filter, reply } => {
                let _ = reply.send(self.subscribe(filter));
            }
            Command::Unsubscribe { reply } => {
                self.unsubscribe();
                let _ = reply.send(());
            }
            Command::Recent { reply } => {
                let _ = reply.send(self.buffer.snapshot());
            }
            Command::CurrentFilter { reply } => {
                let _ = reply.send(self.filter.spec().cloned());
            }
            Command::LastTraffic { reply } => {
                let _ = reply.send(self.manager.last_traffic_at());
            }
            Command::OnNotification(id, callback) => self.listeners.insert(id, callback),
            Command::OnStatusChange(id, callback) => self.manager.on_status_change(id, callback),
            Command::RemoveListener(id) => {
                if !self.listeners.remove(id) {
                    self.manager.remove_listener(id);
                }
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn subscribe(&mut self, filter: SubscriptionFilterSpec) -> Result<(), NotificationError> {
        if self.principal.is_none() {
            return Err(NotificationError::NotAuthenticated);
        }
        tracing::info!(criteria = ?filter.criteria(), "subscribing");

        let message = WireMessage::Subscribe {
            payload: filter.criteria().clone(),
        };
        self.filter = ActiveFilter::Active(filter);
        self.manager.set_subscription(Some(message.clone()));
        if self.manager.state().is_connected() {
            self.manager.send(&message);
        } else {
            self.manager.connect();
        }
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if self.filter == ActiveFilter::NoActiveFilter {
            return;
        }
        tracing::info!("unsubscribing");
        self.filter = ActiveFilter::NoActiveFilter;
        self.manager.set_subscription(None);
        if self.manager.state().is_connected() {
            self.manager.send(&WireMessage::Unsubscribe);
        }
    }

    /// Nothing from one principal may be visible to the next.
    fn end_session(&mut self) {
        if let Some(principal) = self.principal.take() {
            tracing::info!(principal = %principal.id, "session ended");
        }
        self.manager.close();
        self.manager.set_principal(None);
        self.manager.set_subscription(None);
        self.filter = ActiveFilter::NoActiveFilter;
        self.buffer.clear();
        self.dedup.clear();
    }

    fn on_frame(&mut self, text: &str) {
        let notification = match EventCodec::decode(text, Utc::now()) {
            Ok(Inbound::Event(notification)) => notification,
            Ok(Inbound::Control) => return,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable frame");
                return;
            }
        };

        if !self.dedup.accept(&notification.id) {
            tracing::debug!(id = %notification.id, "dropping duplicate notification");
            return;
        }
        if !self.filter.matches(&notification.entity) {
            tracing::debug!(id = %notification.id, "notification does not match active filter");
            return;
        }

        tracing::debug!(id = %notification.id, kind = %notification.kind, "notification accepted");
        self.buffer.push(notification.clone());
        self.listeners.emit(&notification);
        let _ = self.live.send(notification);
    }
}

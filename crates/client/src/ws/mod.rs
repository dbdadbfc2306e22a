//! Connection handling for the notification channel.
//!
//! This module provides:
//! - A single managed connection with auto-reconnect (`ConnectionManager`, driven by the service)
//! - Application-level liveness detection ([`HeartbeatMonitor`])
//! - The retry delay policy ([`ReconnectScheduler`])
//! - The [`Transport`] seam and its WebSocket implementation
//!
//! # Architecture
//!
//! ```text
//!   NotificationService driver task
//!              │ (owns)
//!              ▼
//!   ┌─────────────────────┐   ConnectionEvent    ┌──────────────────┐
//!   │  ConnectionManager  │ ◄─────────────────── │ open / reader /  │
//!   │  state + generation │                      │ timer tasks      │
//!   └─────────────────────┘ ───── spawns ──────► └──────────────────┘
//!              │
//!              ▼
//!        dyn Transport
//! ```
//!
//! Every spawned task reports back through one channel and tags its event with
//! the generation it was started under. The manager bumps the generation on
//! each attempt and each close, so anything reporting late is ignored.

mod connection;
mod heartbeat;
mod reconnect;
mod scheduler;
mod transport;
mod websocket;

pub use connection::ConnectionState;
pub(crate) use connection::{ConnectionEvent, ConnectionManager};
pub use heartbeat::{HeartbeatMonitor, Liveness};
pub use reconnect::{ReconnectConfig, ReconnectScheduler};
pub use transport::{Transport, TransportLink};
pub use websocket::WebSocketTransport;

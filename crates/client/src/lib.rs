//! Propwatch client - real-time property notification channel
//!
//! Keeps one resilient connection to a notification server, subscribes with a
//! filter, and delivers deduplicated, bounded, ordered notifications.
//!
//! ```rust,ignore
//! let transport = Arc::new(WebSocketTransport::new("ws://localhost:8080/api/ws")?);
//! let service = NotificationService::new(NotificationConfig::default(), transport);
//! service.activate(Principal::new("ada"))?;
//! service.subscribe(FilterCriteria::default().location("Seattle")).await?;
//! service.on_notification(|n| println!("{} {}", n.kind, n.entity.id));
//! ```

pub mod buffer;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod listeners;
pub mod notification;
pub mod service;
pub mod session;
pub mod ws;

pub use buffer::BoundedEventBuffer;
pub use codec::{EventCodec, Inbound};
pub use config::NotificationConfig;
pub use dedup::Deduplicator;
pub use error::{CodecError, ConfigError, NotificationError, TransportError};
pub use filter::ActiveFilter;
pub use listeners::ListenerId;
pub use notification::Notification;
pub use service::NotificationService;
pub use session::{bind_session, Principal};
pub use ws::{ConnectionState, ReconnectConfig, Transport, TransportLink, WebSocketTransport};

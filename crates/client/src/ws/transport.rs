//! The transport seam between the connection manager and the network.

use async_trait::async_trait;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::error::TransportError;
use crate::session::Principal;

/// One open bidirectional text channel.
///
/// Dropping `outbound` asks the transport to close. The end of `inbound` is
/// the transport's close signal, whatever the cause.
pub struct TransportLink {
    pub outbound: UnboundedSender<String>,
    pub inbound: UnboundedReceiver<String>,
}

/// Something that can open a link on behalf of a principal.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Resolves once the link is open or the attempt has failed.
    async fn open(&self, principal: &Principal) -> Result<TransportLink, TransportError>;
}

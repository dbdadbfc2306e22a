//! Principal identity and binding to an external session signal.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::service::NotificationService;

/// The authenticated identity a service connects on behalf of.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Follow a session signal: activate on sign-in, re-activate when the
/// principal changes, tear down on sign-out.
///
/// The task ends when the service stops. Dropping the session sender counts
/// as a sign-out.
pub fn bind_session(
    service: NotificationService,
    mut session: watch::Receiver<Option<Principal>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let current = session.borrow_and_update().clone();
            let applied = match current {
                Some(principal) => service.activate(principal),
                None => service.deactivate(),
            };
            if applied.is_err() {
                return;
            }
            if session.changed().await.is_err() {
                tracing::debug!("session source dropped, treating as sign-out");
                let _ = service.deactivate();
                return;
            }
        }
    })
}

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, tokio::sync::mpsc};

use crate::{credentials::Credentials, event::SessionEvent};

/// Domain suffix for individual user addresses.
const USER_SERVER: &str = "s.whatsapp.net";

/// A live connection to the remote messaging service.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Authenticated identity, once the remote side has accepted us.
    fn user(&self) -> Option<String>;

    /// Send a text message, returning the delivery receipt as reported by
    /// the remote service.
    async fn send_text(&self, jid: &str, text: &str) -> Result<serde_json::Value>;

    /// Unlink this device. The client emits a close afterwards.
    async fn logout(&self) -> Result<()>;

    /// Tear the connection down, attaching `reason` for diagnostics.
    async fn end(&self, reason: &str) -> Result<()>;
}

/// A freshly created client plus its ordered lifecycle event stream.
pub struct SessionConnection {
    pub client: Arc<dyn SessionClient>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Creates session clients from persisted credentials.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, credentials: Option<Credentials>) -> Result<SessionConnection>;
}

/// Address for a phone number, with any leading `+` removed.
pub fn user_jid(phone: &str) -> String {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    format!("{digits}@{USER_SERVER}")
}

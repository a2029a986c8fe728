//! Lifecycle controller for the single managed session.
//!
//! All client (re)creation happens inside [`SessionController::run`], which
//! consumes events one at a time, so two `start()` calls never overlap and
//! at most one client is ever installed. Gateway handlers only read the
//! slot (`is_connected`) or borrow the client for `send_message`.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use {
    pairgate_config::ReconnectConfig,
    tokio::sync::mpsc,
    tracing::{debug, error, info, warn},
};

use crate::{
    client::{SessionClient, SessionConnection, SessionConnector},
    credentials::CredentialStore,
    error::SessionError,
    event::{ConnectionState, DisconnectCause, DisconnectInfo, SessionEvent},
    publisher::Publisher,
    status::SessionStatus,
};

/// Outcome of interpreting one lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Nothing to decide (pairing code, credentials, connecting).
    Continue,
    /// Transient close; a fresh client must be started.
    Reconnect,
    /// Close that needs the operator: the client was logged out and will not
    /// be restarted.
    Terminated(DisconnectCause),
    /// Unrecognized close; the client was ended with the disconnect error.
    Failed(u16),
    /// The connection opened and this status was announced.
    Opened(SessionStatus),
}

struct ActiveSession {
    client: Arc<dyn SessionClient>,
    /// Set by an open event, cleared by a close.
    open: bool,
}

pub struct SessionController {
    connector: Arc<dyn SessionConnector>,
    credentials: CredentialStore,
    publisher: Arc<Publisher>,
    reconnect: ReconnectConfig,
    active: RwLock<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        credentials: CredentialStore,
        publisher: Arc<Publisher>,
    ) -> Self {
        Self {
            connector,
            credentials,
            publisher,
            reconnect: ReconnectConfig::default(),
            active: RwLock::new(None),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn slot_mut(&self) -> RwLockWriteGuard<'_, Option<ActiveSession>> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load stored credentials and install a new client, retiring any
    /// previous one. Returns the new client's event stream.
    pub async fn start(&self) -> Result<mpsc::UnboundedReceiver<SessionEvent>, SessionError> {
        let credentials = self.credentials.load().await?;
        let paired = credentials.is_some();

        let SessionConnection { client, events } = self.connector.connect(credentials).await?;

        let previous = self.slot_mut().replace(ActiveSession {
            client,
            open: false,
        });
        if previous.is_some() {
            debug!("retired previous session client");
        }
        info!(paired, "session client started");
        Ok(events)
    }

    /// True iff a client is installed, its connection is open, and it
    /// reports an authenticated identity.
    pub fn is_connected(&self) -> bool {
        self.connected_client().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_connected(self.is_connected())
    }

    fn connected_client(&self) -> Option<Arc<dyn SessionClient>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|active| active.open && active.client.user().is_some())
            .map(|active| Arc::clone(&active.client))
    }

    /// Send `text` to `jid` through the current client.
    pub async fn send_message(
        &self,
        jid: &str,
        text: &str,
    ) -> Result<serde_json::Value, SessionError> {
        let client = self.connected_client().ok_or(SessionError::NotConnected)?;
        Ok(client.send_text(jid, text).await?)
    }

    /// Interpret a single lifecycle event from the current client.
    pub async fn handle_event(&self, event: SessionEvent) -> LifecycleAction {
        match event {
            SessionEvent::CredentialsUpdate(credentials) => {
                if let Err(e) = self.credentials.save(&credentials).await {
                    error!(error = %e, "failed to persist session credentials");
                }
                LifecycleAction::Continue
            },
            SessionEvent::ConnectionUpdate(update) => {
                // Observers of the code change must already see an opened
                // connection as connected.
                if update.connection == Some(ConnectionState::Open) {
                    self.mark_open();
                }
                self.publisher
                    .set_code(update.qr.as_deref().unwrap_or_default());
                match update.connection {
                    Some(ConnectionState::Close) => {
                        self.on_close(update.last_disconnect.as_ref()).await
                    },
                    Some(ConnectionState::Open) => self.on_open(),
                    Some(ConnectionState::Connecting) | None => LifecycleAction::Continue,
                }
            },
        }
    }

    fn mark_open(&self) {
        if let Some(active) = self.slot_mut().as_mut() {
            active.open = true;
        }
    }

    fn on_open(&self) -> LifecycleAction {
        let status = self.status();
        info!(%status, "connection opened");
        self.publisher.publish_status(status);
        LifecycleAction::Opened(status)
    }

    async fn on_close(&self, info: Option<&DisconnectInfo>) -> LifecycleAction {
        let client = self.slot_mut().as_mut().map(|active| {
            active.open = false;
            Arc::clone(&active.client)
        });
        let auth_dir = self.credentials.dir().display().to_string();

        let cause = DisconnectCause::classify(info);
        match cause {
            DisconnectCause::BadSession => {
                warn!(
                    %auth_dir,
                    "session credentials are corrupt; delete {auth_dir} and scan the pairing code again"
                );
                logout(client).await;
                LifecycleAction::Terminated(cause)
            },
            DisconnectCause::ConnectionClosed => {
                info!("connection closed, reconnecting");
                LifecycleAction::Reconnect
            },
            DisconnectCause::ConnectionLost => {
                info!("connection to server lost, reconnecting");
                LifecycleAction::Reconnect
            },
            DisconnectCause::RestartRequired => {
                info!("restart required, restarting");
                LifecycleAction::Reconnect
            },
            DisconnectCause::ConnectionReplaced => {
                warn!("connection replaced by a newer session; closing this one");
                logout(client).await;
                LifecycleAction::Terminated(cause)
            },
            DisconnectCause::LoggedOut => {
                warn!(
                    %auth_dir,
                    "device logged out; delete {auth_dir} and scan the pairing code again"
                );
                self.publisher.publish_status(SessionStatus::Disconnected);
                logout(client).await;
                LifecycleAction::Terminated(cause)
            },
            DisconnectCause::Unknown(code) => {
                let message = info.and_then(|i| i.message.as_deref()).unwrap_or("");
                let reason = format!("unknown disconnect reason: {code}|{message}");
                error!(code, detail = message, "unknown disconnect reason, not reconnecting");
                if let Some(client) = client
                    && let Err(e) = client.end(&reason).await
                {
                    warn!(error = %e, "failed to end session client");
                }
                LifecycleAction::Failed(code)
            },
        }
    }

    /// Drive the session: start a client, then apply every event it emits,
    /// reconnecting inline when told to. A reconnect whose `start()` fails
    /// counts as an attempt and is retried. Returns once the current
    /// client's event stream ends without a reconnect, or the reconnect
    /// ceiling is hit.
    pub async fn run(&self) -> Result<(), SessionError> {
        let mut events = self.start().await?;
        let mut attempts: u32 = 0;

        'session: while let Some(event) = events.recv().await {
            match self.handle_event(event).await {
                LifecycleAction::Reconnect => {
                    let mut failed = false;
                    loop {
                        attempts += 1;
                        let Some(mut delay) = self.reconnect.delay_for(attempts) else {
                            error!(attempts, "reconnect limit reached, giving up");
                            break 'session;
                        };
                        if failed {
                            delay = delay.max(self.reconnect.initial_delay());
                        }
                        if !delay.is_zero() {
                            debug!(?delay, attempt = attempts, "waiting before reconnect");
                            tokio::time::sleep(delay).await;
                        }
                        match self.start().await {
                            Ok(next) => {
                                events = next;
                                break;
                            },
                            Err(e) => {
                                warn!(attempt = attempts, error = %e, "reconnect failed");
                                if !failed {
                                    self.retire();
                                    failed = true;
                                }
                            },
                        }
                    }
                },
                LifecycleAction::Opened(SessionStatus::Connected) => attempts = 0,
                _ => {},
            }
        }

        self.retire();
        Ok(())
    }

    /// Drop the current client and announce the session as disconnected.
    fn retire(&self) {
        if self.slot_mut().take().is_some() {
            info!("session client retired");
        }
        self.publisher.publish_status(SessionStatus::Disconnected);
    }
}

async fn logout(client: Option<Arc<dyn SessionClient>>) {
    if let Some(client) = client
        && let Err(e) = client.logout().await
    {
        warn!(error = %e, "session logout failed");
    }
}

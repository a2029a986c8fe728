//! Fakes shared by the gateway's router, broadcast and WebSocket tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    secrecy::Secret,
    serde_json::{Value, json},
    tokio::sync::{broadcast, mpsc},
};

use pairgate_session::{
    ConnectionUpdate, CredentialStore, Credentials, Publisher, SessionClient, SessionConnection,
    SessionConnector, SessionController, SessionEvent,
};

use crate::{auth::RequestSigner, broadcast::BroadcastObserver, state::GatewayState};

pub const SECRET: &str = "test-secret";
pub const ME: &str = "15550000000:1@s.whatsapp.net";

#[derive(Default)]
pub struct FakeClient {
    pub user: Option<String>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: bool,
}

impl FakeClient {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionClient for FakeClient {
    fn user(&self) -> Option<String> {
        self.user.clone()
    }

    async fn send_text(&self, jid: &str, text: &str) -> Result<Value> {
        if self.fail_sends {
            bail!("remote rejected the message");
        }
        self.sent
            .lock()
            .unwrap()
            .push((jid.to_string(), text.to_string()));
        Ok(json!({"key": {"remoteJid": jid, "fromMe": true, "id": "3EB0C0FFEE"}}))
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn end(&self, _reason: &str) -> Result<()> {
        Ok(())
    }
}

/// Hands out one shared client and keeps every event sender alive.
pub struct FakeConnector {
    client: Arc<FakeClient>,
    senders: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, _credentials: Option<Credentials>) -> Result<SessionConnection> {
        let (tx, events) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        Ok(SessionConnection {
            client: self.client.clone(),
            events,
        })
    }
}

pub struct TestGateway {
    pub state: Arc<GatewayState>,
    pub client: Arc<FakeClient>,
    _dir: tempfile::TempDir,
}

pub async fn gateway(connected: bool) -> TestGateway {
    gateway_with(FakeClient {
        user: connected.then(|| ME.to_string()),
        ..Default::default()
    })
    .await
}

/// Gateway whose session has been started and opened with `client`. The
/// session is connected iff the client reports an identity.
pub async fn gateway_with(client: FakeClient) -> TestGateway {
    let gw = started(client).await;

    // Wait for the open announcement so tests start from a quiet channel.
    let mut rx = gw.state.subscribe();
    gw.state
        .session
        .handle_event(SessionEvent::ConnectionUpdate(ConnectionUpdate::open()))
        .await;
    next_frame(&mut rx).await;
    gw
}

/// Gateway whose session client is installed but has not opened yet.
pub async fn started(client: FakeClient) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(client);
    let connector = Arc::new(FakeConnector {
        client: client.clone(),
        senders: Mutex::default(),
    });
    let session = Arc::new(SessionController::new(
        connector,
        CredentialStore::new(dir.path().join("auth_state")),
        Arc::new(Publisher::new()),
    ));
    let signer = RequestSigner::new(&Secret::new(SECRET.to_string())).unwrap();
    let state = GatewayState::new(session.clone(), signer);
    session
        .publisher()
        .register(Arc::new(BroadcastObserver::new(
            &session,
            state.broadcaster.clone(),
        )));
    session.start().await.unwrap();

    TestGateway {
        state,
        client,
        _dir: dir,
    }
}

/// Next broadcast frame, parsed. Fails the test after a second of silence.
pub async fn next_frame(rx: &mut broadcast::Receiver<String>) -> Value {
    let text = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a broadcast")
        .unwrap();
    serde_json::from_str(&text).unwrap()
}

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::broadcast;

use pairgate_session::SessionController;

use crate::{auth::RequestSigner, broadcast::Broadcaster};

/// Frames buffered per WebSocket client before it starts lagging.
const BROADCAST_CAPACITY: usize = 64;

/// Shared gateway runtime state, wrapped in Arc for use across handlers.
pub struct GatewayState {
    pub session: Arc<SessionController>,
    pub signer: RequestSigner,
    /// Fan-out channel for serialized frames; each WebSocket subscribes.
    pub events: broadcast::Sender<String>,
    /// Ordered queue feeding `events`.
    pub broadcaster: Broadcaster,
    /// Server version string.
    pub version: String,
    next_conn_id: AtomicU64,
}

impl GatewayState {
    pub fn new(session: Arc<SessionController>, signer: RequestSigner) -> Arc<Self> {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        let broadcaster = Broadcaster::spawn(events.clone());
        Arc::new(Self {
            session,
            signer,
            events,
            broadcaster,
            version: env!("CARGO_PKG_VERSION").to_string(),
            next_conn_id: AtomicU64::new(0),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Number of connected WebSocket clients.
    pub fn client_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

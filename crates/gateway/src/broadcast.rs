//! Fan-out of session notifications to WebSocket clients.
//!
//! Publisher callbacks are synchronous, but rendering a pairing code is not
//! free, so notices are queued to a single worker task that renders and
//! broadcasts them in the order they were published.

use std::sync::{Arc, Weak};

use {
    serde::Serialize,
    serde_json::Value,
    tokio::sync::{broadcast, mpsc},
    tracing::{debug, trace, warn},
};

use pairgate_session::{SessionController, SessionObserver, SessionStatus};

use crate::qr::qr_payload;

pub const EVENT_QR: &str = "qr";
pub const EVENT_STATUS: &str = "status";

/// Outbound WebSocket frame.
#[derive(Debug, Serialize)]
pub struct Frame<'a> {
    pub event: &'a str,
    pub payload: Value,
}

/// Serialize a frame and push it to every subscriber.
pub fn broadcast(events: &broadcast::Sender<String>, event: &str, payload: Value) {
    let text = match serde_json::to_string(&Frame { event, payload }) {
        Ok(text) => text,
        Err(e) => {
            warn!(event, error = %e, "failed to encode broadcast frame");
            return;
        },
    };
    // No subscribers is fine: nobody is listening yet.
    if events.send(text).is_err() {
        trace!(event, "broadcast with no subscribers");
    }
}

#[derive(Debug)]
enum Notice {
    /// A pairing code to announce. `connected` is sampled when the code
    /// changed, not when the notice is rendered.
    Code { code: String, connected: bool },
    Status(SessionStatus),
}

/// Ordered queue in front of the broadcast channel.
#[derive(Clone)]
pub struct Broadcaster {
    notices: mpsc::UnboundedSender<Notice>,
}

impl Broadcaster {
    /// Start the worker that drains notices into `events`. The worker exits
    /// once every `Broadcaster` clone has been dropped.
    pub fn spawn(events: broadcast::Sender<String>) -> Self {
        let (notices, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(rx, events));
        Self { notices }
    }

    /// Announce a pairing code. While connected only the status is sent;
    /// otherwise the rendered code followed by `DESCONECTADO`.
    pub fn code(&self, code: impl Into<String>, connected: bool) {
        self.push(Notice::Code {
            code: code.into(),
            connected,
        });
    }

    pub fn status(&self, status: SessionStatus) {
        self.push(Notice::Status(status));
    }

    fn push(&self, notice: Notice) {
        if let Err(e) = self.notices.send(notice) {
            warn!(notice = ?e.0, "broadcast worker is gone, dropping notice");
        }
    }
}

async fn drain(mut rx: mpsc::UnboundedReceiver<Notice>, events: broadcast::Sender<String>) {
    while let Some(notice) = rx.recv().await {
        match notice {
            Notice::Status(status) => {
                broadcast(&events, EVENT_STATUS, Value::from(status.as_str()));
            },
            Notice::Code {
                connected: true, ..
            } => {
                broadcast(
                    &events,
                    EVENT_STATUS,
                    Value::from(SessionStatus::Connected.as_str()),
                );
            },
            Notice::Code {
                code,
                connected: false,
            } => {
                let payload = match tokio::task::spawn_blocking(move || qr_payload(&code)).await
                {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "pairing code render task failed");
                        Value::Null
                    },
                };
                broadcast(&events, EVENT_QR, payload);
                broadcast(
                    &events,
                    EVENT_STATUS,
                    Value::from(SessionStatus::Disconnected.as_str()),
                );
            },
        }
    }
    debug!("broadcast worker stopped");
}

/// Publisher observer that turns code and status changes into broadcasts.
pub struct BroadcastObserver {
    session: Weak<SessionController>,
    broadcaster: Broadcaster,
}

impl BroadcastObserver {
    pub fn new(session: &Arc<SessionController>, broadcaster: Broadcaster) -> Self {
        Self {
            session: Arc::downgrade(session),
            broadcaster,
        }
    }
}

impl SessionObserver for BroadcastObserver {
    fn code_changed(&self, code: &str) {
        let connected = self
            .session
            .upgrade()
            .is_some_and(|session| session.is_connected());
        self.broadcaster.code(code, connected);
    }

    fn status_published(&self, status: SessionStatus) {
        self.broadcaster.status(status);
    }
}

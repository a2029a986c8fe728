use std::{
    collections::HashMap,
    process::Stdio,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    pairgate_config::BridgeConfig,
    pairgate_session::{ConnectionState, ConnectionUpdate, Credentials, SessionClient, SessionEvent},
    serde_json::{Value, json},
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        process::{Child, ChildStdin, ChildStdout, Command},
        sync::{Mutex, mpsc, oneshot},
        task::JoinHandle,
    },
    tracing::{debug, trace, warn},
};

use crate::{
    error::BridgeError,
    protocol::{Inbound, Outbound, Response, encode_line},
};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Session client backed by one sidecar process.
pub struct BridgeClient {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: Pending,
    next_id: AtomicU64,
    user: Arc<RwLock<Option<String>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl BridgeClient {
    /// Spawn the sidecar, hand it the stored credentials, and start reading
    /// its frames. Lifecycle events are forwarded in order on the returned
    /// receiver, which closes when the sidecar's stdout does.
    pub async fn spawn(
        config: &BridgeConfig,
        credentials: Option<&Credentials>,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>), BridgeError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(BridgeError::Stdio("stdin"))?;
        let stdout = child.stdout.take().ok_or(BridgeError::Stdio("stdout"))?;

        stdin
            .write_all(encode_line(&Outbound::Init { credentials })?.as_bytes())
            .await?;
        stdin.flush().await?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let user = Arc::new(RwLock::new(None));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_frames(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&user),
            events_tx,
        ));

        debug!(command = %config.command, pid = child.id(), "bridge started");

        let client = Arc::new(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            user,
            reader: Mutex::new(Some(reader)),
            request_timeout: config.request_timeout(),
        });
        Ok((client, events_rx))
    }

    /// Send a request frame and wait for the matching response.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = encode_line(&Outbound::Request { id, method, params })?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        trace!(method, id, "gateway -> bridge");
        {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await?;
        }

        let resp = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                return Err(BridgeError::Closed {
                    method: method.into(),
                });
            },
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(BridgeError::Timeout {
                    method: method.into(),
                });
            },
        };

        if let Some(message) = resp.error {
            return Err(BridgeError::Remote {
                method: method.into(),
                message,
            });
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }

    pub async fn is_alive(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }

    /// Kill the sidecar. Its event stream closes shortly after.
    pub async fn kill(&self) {
        if let Err(e) = self.child.lock().await.kill().await {
            debug!(error = %e, "bridge already exited");
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
    }
}

#[async_trait]
impl SessionClient for BridgeClient {
    fn user(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn send_text(&self, jid: &str, text: &str) -> anyhow::Result<Value> {
        Ok(self
            .request("send", json!({"jid": jid, "text": text}))
            .await?)
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.request("logout", json!({})).await?;
        Ok(())
    }

    async fn end(&self, reason: &str) -> anyhow::Result<()> {
        let result = self.request("end", json!({"reason": reason})).await;
        self.kill().await;
        result.map(drop).map_err(Into::into)
    }
}

async fn read_frames(
    stdout: ChildStdout,
    pending: Pending,
    user: Arc<RwLock<Option<String>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("bridge stdout closed");
                break;
            },
            Ok(_) => {},
            Err(e) => {
                warn!(error = %e, "error reading from bridge stdout");
                break;
            },
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        trace!(raw = %trimmed, "bridge -> gateway");

        let frame = match serde_json::from_str::<Inbound>(trimmed) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "ignoring malformed bridge frame");
                continue;
            },
        };

        let event = match frame {
            Inbound::Response { id, result, error } => {
                match pending.lock().await.remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(Response { result, error });
                    },
                    None => warn!(id, "response for unknown request id"),
                }
                continue;
            },
            Inbound::CredsUpdate { credentials } => SessionEvent::CredentialsUpdate(credentials),
            Inbound::ConnectionUpdate {
                connection,
                last_disconnect,
                qr,
                user: identity,
            } => {
                // Identity must be visible before the event is interpreted.
                {
                    let mut current = user.write().unwrap_or_else(PoisonError::into_inner);
                    if connection == Some(ConnectionState::Close) {
                        *current = None;
                    } else if identity.is_some() {
                        *current = identity;
                    }
                }
                SessionEvent::ConnectionUpdate(ConnectionUpdate {
                    connection,
                    last_disconnect,
                    qr,
                })
            },
        };

        if events.send(event).is_err() {
            debug!("session dropped the event stream");
            break;
        }
    }

    // Fail any request still waiting on this process.
    pending.lock().await.clear();
}

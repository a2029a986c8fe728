//! Frames exchanged with the sidecar, one JSON object per line.

use {
    pairgate_session::{ConnectionState, Credentials, DisconnectInfo},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Gateway → sidecar.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound<'a> {
    Init {
        credentials: Option<&'a Credentials>,
    },
    Request {
        id: u64,
        method: &'a str,
        params: Value,
    },
}

/// Sidecar → gateway.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Inbound {
    #[serde(rename = "connection.update")]
    ConnectionUpdate {
        #[serde(default)]
        connection: Option<ConnectionState>,
        #[serde(default, rename = "lastDisconnect")]
        last_disconnect: Option<DisconnectInfo>,
        #[serde(default)]
        qr: Option<String>,
        /// Authenticated identity, sent once the login completes.
        #[serde(default)]
        user: Option<String>,
    },
    #[serde(rename = "creds.update")]
    CredsUpdate { credentials: Credentials },
    #[serde(rename = "response")]
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Reply to a `request` frame.
#[derive(Debug)]
pub struct Response {
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Serialize a frame as a single newline-terminated line.
pub fn encode_line(frame: &Outbound<'_>) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}

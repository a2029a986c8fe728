//! Stdio bridge: run a sidecar process that speaks the messaging protocol
//! and exchange newline-delimited JSON frames with it over stdin/stdout.
//!
//! The gateway writes one `init` frame carrying the stored credentials, then
//! `request` frames for send/logout/end. The sidecar writes
//! `connection.update`, `creds.update`, and `response` frames. One sidecar
//! process backs exactly one session client; reconnecting spawns a new one.

pub mod client;
pub mod connector;
pub mod error;
pub mod protocol;

pub use {client::BridgeClient, connector::StdioConnector, error::BridgeError};

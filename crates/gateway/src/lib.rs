//! Gateway: HTTP + WebSocket front for the single messaging session.
//!
//! Lifecycle:
//! 1. Load config, resolve the request-signing secret
//! 2. Build the session controller over the stdio bridge
//! 3. Register the broadcast observer on the publisher
//! 4. Start HTTP (ping, estado, qr, enviar, health) and the `/ws` channel
//! 5. Run the session lifecycle in the background
//!
//! Session decisions live in `pairgate-session`; this crate only renders
//! them for API clients.

pub mod auth;
pub mod broadcast;
pub mod error;
pub mod qr;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod testing;

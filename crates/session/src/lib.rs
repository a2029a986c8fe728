//! Single-session lifecycle management.
//!
//! The [`SessionController`] owns the one live [`SessionClient`], interprets
//! the lifecycle events it emits, and decides whether to reconnect, stop and
//! wait for the operator, or mark the session connected. Pairing-code and
//! status changes fan out through the [`Publisher`] to registered
//! [`SessionObserver`]s.

pub mod client;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod event;
pub mod publisher;
pub mod status;

pub use {
    client::{SessionClient, SessionConnection, SessionConnector, user_jid},
    controller::{LifecycleAction, SessionController},
    credentials::{CredentialStore, Credentials},
    error::SessionError,
    event::{ConnectionState, ConnectionUpdate, DisconnectCause, DisconnectInfo, SessionEvent},
    publisher::{Publisher, SessionObserver},
    status::SessionStatus,
};

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;

/// Lifecycle notification emitted by a session client, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConnectionUpdate(ConnectionUpdate),
    /// The client rotated its credentials; they must be persisted.
    CredentialsUpdate(Credentials),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// One connection update. Every update carries the current pairing code;
/// an absent code means "no code right now", not "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdate {
    #[serde(default)]
    pub connection: Option<ConnectionState>,
    #[serde(default)]
    pub last_disconnect: Option<DisconnectInfo>,
    #[serde(default)]
    pub qr: Option<String>,
}

impl ConnectionUpdate {
    pub fn open() -> Self {
        Self {
            connection: Some(ConnectionState::Open),
            ..Default::default()
        }
    }

    pub fn closed(status_code: u16) -> Self {
        Self {
            connection: Some(ConnectionState::Close),
            last_disconnect: Some(DisconnectInfo {
                status_code: Some(status_code),
                message: None,
            }),
            qr: None,
        }
    }

    pub fn pairing_code(code: impl Into<String>) -> Self {
        Self {
            qr: Some(code.into()),
            ..Default::default()
        }
    }
}

/// Error attached to a closed connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectInfo {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Why a connection closed, classified from the remote status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// 500: stored credentials are unusable.
    BadSession,
    /// 428
    ConnectionClosed,
    /// 408: also reported for handshake timeouts.
    ConnectionLost,
    /// 440: another session took over this identity.
    ConnectionReplaced,
    /// 401: the linked device was removed from the phone.
    LoggedOut,
    /// 515
    RestartRequired,
    Unknown(u16),
}

impl DisconnectCause {
    /// Status assumed when a close carries no usable error.
    pub const DEFAULT_STATUS: u16 = 500;

    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            408 => Self::ConnectionLost,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            500 => Self::BadSession,
            515 => Self::RestartRequired,
            other => Self::Unknown(other),
        }
    }

    pub fn classify(info: Option<&DisconnectInfo>) -> Self {
        Self::from_status_code(
            info.and_then(|i| i.status_code)
                .unwrap_or(Self::DEFAULT_STATUS),
        )
    }

    /// Transient causes that warrant an automatic reconnect.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ConnectionLost | Self::RestartRequired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(DisconnectCause::from_status_code(401), DisconnectCause::LoggedOut);
        assert_eq!(
            DisconnectCause::from_status_code(408),
            DisconnectCause::ConnectionLost
        );
        assert_eq!(
            DisconnectCause::from_status_code(428),
            DisconnectCause::ConnectionClosed
        );
        assert_eq!(
            DisconnectCause::from_status_code(440),
            DisconnectCause::ConnectionReplaced
        );
        assert_eq!(DisconnectCause::from_status_code(500), DisconnectCause::BadSession);
        assert_eq!(
            DisconnectCause::from_status_code(515),
            DisconnectCause::RestartRequired
        );
        assert_eq!(
            DisconnectCause::from_status_code(411),
            DisconnectCause::Unknown(411)
        );
    }

    #[test]
    fn missing_error_is_bad_session() {
        assert_eq!(DisconnectCause::classify(None), DisconnectCause::BadSession);
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectInfo::default())),
            DisconnectCause::BadSession
        );
    }

    #[test]
    fn only_transient_causes_reconnect() {
        assert!(DisconnectCause::ConnectionLost.is_transient());
        assert!(DisconnectCause::RestartRequired.is_transient());
        assert!(!DisconnectCause::LoggedOut.is_transient());
        assert!(!DisconnectCause::ConnectionReplaced.is_transient());
        assert!(!DisconnectCause::Unknown(403).is_transient());
    }

    #[test]
    fn parses_camel_case_update() {
        let update: ConnectionUpdate = serde_json::from_str(
            r#"{"connection":"close","lastDisconnect":{"statusCode":401,"message":"logged out"}}"#,
        )
        .unwrap();
        assert_eq!(update.connection, Some(ConnectionState::Close));
        assert_eq!(
            DisconnectCause::classify(update.last_disconnect.as_ref()),
            DisconnectCause::LoggedOut
        );
        assert!(update.qr.is_none());
    }
}

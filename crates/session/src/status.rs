use std::fmt;

use serde::{Deserialize, Serialize};

/// Connectivity of the single managed session, as shown to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "CONECTADO")]
    Connected,
    #[default]
    #[serde(rename = "DESCONECTADO")]
    Disconnected,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "CONECTADO",
            Self::Disconnected => "DESCONECTADO",
        }
    }

    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

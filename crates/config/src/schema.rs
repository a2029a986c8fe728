use std::{collections::HashMap, path::PathBuf, time::Duration};

use {secrecy::Secret, serde::Deserialize};

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PairgateConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub bridge: BridgeConfig,
    pub reconnect: ReconnectConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3003,
        }
    }
}

/// Request authentication for `POST /enviar`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC-SHA256 key. `PAIRGATE_HMAC_SECRET` takes precedence.
    pub hmac_secret: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding the persisted session credentials.
    pub auth_dir: PathBuf,
    /// Draw each new pairing code on stderr so the device can be paired
    /// from the console.
    pub print_qr: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_dir: PathBuf::from("auth_state"),
            print_qr: true,
        }
    }
}

/// Sidecar process that speaks the messaging protocol on our behalf.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: "pairgate-bridge".into(),
            args: Vec::new(),
            env: HashMap::new(),
            request_timeout_secs: 30,
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reconnect pacing. With `backoff = false` (the default) reconnects are
/// immediate and unbounded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub backoff: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive reconnects allowed before giving up. 0 means unbounded.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff: false,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Floor for retries after a client failed to start, so a broken bridge
    /// is not respawned in a tight loop.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay before reconnect number `attempt` (1-based), or `None` once the
    /// ceiling is reached.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts != 0 && attempt > self.max_attempts {
            return None;
        }
        if !self.backoff {
            return Some(Duration::ZERO);
        }
        let exp = attempt.saturating_sub(1).min(20);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }
}

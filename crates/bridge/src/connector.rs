use {
    anyhow::Result,
    async_trait::async_trait,
    pairgate_config::BridgeConfig,
    pairgate_session::{Credentials, SessionConnection, SessionConnector},
    tracing::info,
};

use crate::client::BridgeClient;

/// Starts one sidecar process per session client.
pub struct StdioConnector {
    config: BridgeConfig,
}

impl StdioConnector {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(&self, credentials: Option<Credentials>) -> Result<SessionConnection> {
        info!(command = %self.config.command, "starting session bridge");
        let (client, events) = BridgeClient::spawn(&self.config, credentials.as_ref()).await?;
        Ok(SessionConnection { client, events })
    }
}

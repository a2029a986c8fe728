use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is not connected")]
    NotConnected,

    #[error("failed to read credentials at {}: {source}", path.display())]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt credentials at {}: {source}", path.display())]
    CredentialsCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to persist credentials at {}: {source}", path.display())]
    CredentialsWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("session client: {0:#}")]
    Client(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to spawn bridge `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to capture bridge {0}")]
    Stdio(&'static str),

    #[error("bridge i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge frame encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bridge request `{method}` timed out")]
    Timeout { method: String },

    #[error("bridge exited before answering `{method}`")]
    Closed { method: String },

    #[error("bridge rejected `{method}`: {message}")]
    Remote { method: String, message: String },
}

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SessionError;

/// Opaque session credentials as produced by the session client.
pub type Credentials = serde_json::Value;

const CREDS_FILE: &str = "creds.json";

/// File-backed credential storage at `<auth_dir>/creds.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }

    /// Load persisted credentials. `Ok(None)` when nothing has been saved
    /// yet; an error when the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<Credentials>, SessionError> {
        let path = self.path();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored credentials");
                return Ok(None);
            },
            Err(source) => return Err(SessionError::CredentialsRead { path, source }),
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| SessionError::CredentialsCorrupt { path, source })
    }

    /// Replace the stored credentials.
    pub async fn save(&self, credentials: &Credentials) -> Result<(), SessionError> {
        let path = self.path();
        let write_err = |source| SessionError::CredentialsWrite {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let data = serde_json::to_string_pretty(credentials)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        let tmp = self.dir.join(format!("{CREDS_FILE}.tmp"));
        tokio::fs::write(&tmp, data).await.map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }

        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;
        debug!(path = %path.display(), "saved credentials");
        Ok(())
    }

    /// Remove all stored credentials so the next start pairs from scratch.
    pub async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!(dir = %self.dir.display(), "cleared stored credentials");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::CredentialsWrite {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

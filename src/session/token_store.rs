//! Token store implementations
//!
//! - `MemoryTokenStore`: process-local, for tests and ephemeral sessions
//! - `FileTokenStore`: JSON file on disk, survives restarts

use crate::auth::Credential;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::traits::TokenStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(credential: Credential) -> Self {
        Self {
            token: Mutex::new(Some(credential)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_token(&self) -> Result<Option<Credential>> {
        Ok(self.slot().clone())
    }

    async fn set_token(&self, credential: &Credential) -> Result<()> {
        *self.slot() = Some(credential.clone());
        Ok(())
    }

    async fn clear_token(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

const TOKEN_FILE_VERSION: u32 = 1;

/// On-disk layout of the token file
#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    token: Option<Credential>,
}

/// Token store backed by a JSON file.
///
/// Call [`FileTokenStore::rehydrate`] once at startup; afterwards reads are
/// served from memory and writes go through to disk.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// `None` until rehydrated
    cache: Mutex<Option<Option<Credential>>>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Store at the configured token file
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.token_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_rehydrated(&self) -> bool {
        self.cached().is_some()
    }

    /// Load the persisted credential into memory.
    ///
    /// A missing file means no credential. Blank tokens are dropped.
    pub async fn rehydrate(&self) -> Result<Option<Credential>> {
        let token = self.read_file().await?;
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        tracing::debug!(
            path = %self.path.display(),
            present = token.is_some(),
            "Token store rehydrated"
        );
        Ok(token)
    }

    fn cached(&self) -> Option<Option<Credential>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn read_file(&self) -> Result<Option<Credential>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::TokenStore(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let file: TokenFile = serde_json::from_str(&content).map_err(|e| {
            SessionError::TokenStore(format!("Corrupt token file {}: {}", self.path.display(), e))
        })?;

        if file.version != TOKEN_FILE_VERSION {
            return Err(SessionError::TokenStore(format!(
                "Unsupported token file version {} (expected {})",
                file.version, TOKEN_FILE_VERSION
            )));
        }

        Ok(file.token.filter(|t| !t.is_blank()))
    }

    async fn write_file(&self, token: Option<&Credential>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    SessionError::TokenStore(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let body = serde_json::to_string_pretty(&TokenFile {
            version: TOKEN_FILE_VERSION,
            token: token.cloned(),
        })?;

        // Write-then-rename so a crash never leaves a torn file
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| SessionError::TokenStore(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            SessionError::TokenStore(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.cloned());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get_token(&self) -> Result<Option<Credential>> {
        match self.cached() {
            Some(token) => Ok(token),
            None => self.rehydrate().await,
        }
    }

    async fn set_token(&self, credential: &Credential) -> Result<()> {
        self.write_file(Some(credential)).await
    }

    async fn clear_token(&self) -> Result<()> {
        self.write_file(None).await
    }
}

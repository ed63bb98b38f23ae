//! Credential storage trait

use crate::auth::Credential;
use crate::error::Result;
use async_trait::async_trait;

/// Holds at most one opaque credential.
///
/// Reads may suspend. A missing credential is `Ok(None)`, not an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self) -> Result<Option<Credential>>;

    async fn set_token(&self, credential: &Credential) -> Result<()>;

    /// Clearing an empty store succeeds
    async fn clear_token(&self) -> Result<()>;
}

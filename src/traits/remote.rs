//! Remote endpoint traits

use crate::auth::{Credential, UserProfile};
use crate::error::Result;
use async_trait::async_trait;

/// Remote session restore.
///
/// Implementations report a rejected credential as
/// `SessionError::Remote { status: 401, .. }` so the controller can tell it
/// apart from transport failures.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn restore_session(&self, credential: &Credential) -> Result<UserProfile>;
}

/// Server side of a toggle-like action (e.g. save/unsave a post).
///
/// `check_status` returning `Ok(None)` means the server had no opinion and
/// the caller's seeded value stands.
#[async_trait]
pub trait ToggleRemote<T: Send + 'static>: Send + Sync {
    async fn check_status(&self, entity_id: u64) -> Result<Option<T>>;

    /// Flip the server-side value. Repeating is tolerated by the server.
    async fn toggle(&self, entity_id: u64) -> Result<()>;
}

/// Subsystem started once the session is authenticated and ready
/// (notification badges and the like).
#[async_trait]
pub trait DependentInitializer: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<()>;
}

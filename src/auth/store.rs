//! Auth state store
//!
//! Holds the current [`AuthSnapshot`]. Writes replace the whole snapshot and
//! are visible to every reader before `set` returns; listeners are invoked
//! synchronously, in registration order, right after the write.
//!
//! Only the session controller and [`AuthStateStore::sign_out`] may write.
//! `set` is crate-private to keep it that way.

use crate::auth::snapshot::AuthSnapshot;
use crate::error::Result;
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::traits::TokenStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct Inner {
    current: watch::Sender<AuthSnapshot>,
    revision: AtomicU64,
    listeners: ListenerRegistry<AuthSnapshot>,
}

/// Shared handle to the process-wide auth state.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct AuthStateStore {
    inner: Arc<Inner>,
}

impl AuthStateStore {
    /// Create a store holding the signed-out snapshot
    pub fn new() -> Self {
        let (current, _) = watch::channel(AuthSnapshot::unauthenticated());
        Self {
            inner: Arc::new(Inner {
                current,
                revision: AtomicU64::new(0),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Current snapshot
    pub fn get(&self) -> AuthSnapshot {
        self.inner.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_authenticated()
    }

    /// Number of completed writes since creation
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Atomically replace the snapshot and notify listeners
    pub(crate) fn set(&self, snapshot: AuthSnapshot) {
        self.inner.current.send_replace(snapshot.clone());
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            revision,
            authenticated = snapshot.is_authenticated(),
            user_id = ?snapshot.user_id(),
            "Auth snapshot replaced"
        );
        self.inner.listeners.notify(&snapshot);
    }

    /// Register a listener invoked after every write
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AuthSnapshot) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Async view of the snapshot for tasks that await changes
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.current.subscribe()
    }

    /// Reset to the signed-out snapshot and clear the stored credential.
    ///
    /// Safe from any bootstrap phase. The snapshot is replaced first so the
    /// navigation gate switches graphs even if clearing the token fails.
    pub async fn sign_out(&self, tokens: &dyn TokenStore) -> Result<()> {
        self.set(AuthSnapshot::unauthenticated());
        tracing::info!("Signed out");

        tokens.clear_token().await.map_err(|e| {
            tracing::error!("Failed to clear stored credential on sign-out: {}", e);
            e
        })
    }
}

impl Default for AuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStateStore")
            .field("authenticated", &self.is_authenticated())
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::snapshot::Credential;
    use crate::session::MemoryTokenStore;
    use crate::test_support::profile;
    use std::sync::Mutex;

    #[test]
    fn test_set_then_get_round_trip() {
        let store = AuthStateStore::new();
        let snapshot = AuthSnapshot::authenticated(Credential::new("tok"), profile(7, "abc"));

        store.set(snapshot.clone());
        assert_eq!(store.get(), snapshot);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_listener_sees_new_snapshot_synchronously() {
        let store = AuthStateStore::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let reader = store.clone();
        let sink = observed.clone();
        store.subscribe(move |snapshot| {
            // the store already holds what the listener is told about
            assert_eq!(&reader.get(), snapshot);
            sink.lock().unwrap().push(snapshot.username().map(String::from));
        });

        store.set(AuthSnapshot::authenticated(Credential::new("tok"), profile(7, "abc")));
        store.set(AuthSnapshot::unauthenticated());

        assert_eq!(
            *observed.lock().unwrap(),
            vec![Some("abc".to_string()), None]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = AuthStateStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(AuthSnapshot::unauthenticated());
        assert!(store.unsubscribe(id));
        store.set(AuthSnapshot::unauthenticated());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_out_resets_snapshot_and_token() {
        let store = AuthStateStore::new();
        let tokens = MemoryTokenStore::with_token(Credential::new("tok"));
        store.set(AuthSnapshot::authenticated(Credential::new("tok"), profile(7, "abc")));

        store.sign_out(&tokens).await.unwrap();

        assert!(!store.is_authenticated());
        assert!(store.get().view().is_consistent());
        assert!(tokens.get_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_receives_latest_snapshot() {
        let store = AuthStateStore::new();
        let mut rx = store.watch();

        store.set(AuthSnapshot::authenticated(Credential::new("tok"), profile(7, "abc")));

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated());
    }
}

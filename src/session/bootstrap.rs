//! Session bootstrap controller
//!
//! Runs once per launch after rehydration:
//!
//! 1. `CheckingToken`: read the stored credential
//! 2. No credential: write the signed-out snapshot, `Ready`
//! 3. Credential: `RestoringSession`, ask the server who it belongs to
//! 4. Restored: write the authenticated snapshot, `Ready`, start dependents
//! 5. Rejected (401): write the signed-out snapshot, `Ready`
//! 6. Anything else: `Failed` with a message, store untouched, wait for `retry()`
//!
//! Re-entrant triggers (a mount effect firing twice) are ignored while a run
//! is in flight, so there is never more than one writer racing on the store.

use crate::auth::{AuthSnapshot, AuthStateStore, Credential, UserProfile};
use crate::config::SessionConfig;
use crate::error::{FailureClass, Result, SessionError};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::session::rehydrate::RehydrationGate;
use crate::traits::{DependentInitializer, SessionApi, TokenStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Bootstrap lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    Initializing,
    CheckingToken,
    RestoringSession,
    Ready,
    Failed,
}

impl BootstrapPhase {
    /// `Ready` and `Failed` end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::CheckingToken => "checking_token",
            Self::RestoringSession => "restoring_session",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
struct PhaseState {
    phase: BootstrapPhase,
    failure: Option<String>,
}

/// Orchestrates the startup sequence and owns the bootstrap phase.
///
/// Together with [`AuthStateStore::sign_out`] this is the only writer of the
/// auth state store.
pub struct SessionController {
    store: AuthStateStore,
    tokens: Arc<dyn TokenStore>,
    api: Arc<dyn SessionApi>,
    gate: RehydrationGate,
    config: SessionConfig,
    initializers: Vec<Arc<dyn DependentInitializer>>,
    state: Mutex<PhaseState>,
    running: AtomicBool,
    phase_tx: watch::Sender<BootstrapPhase>,
    phase_listeners: ListenerRegistry<BootstrapPhase>,
}

impl SessionController {
    pub fn new(
        store: AuthStateStore,
        tokens: Arc<dyn TokenStore>,
        api: Arc<dyn SessionApi>,
        gate: RehydrationGate,
        config: SessionConfig,
    ) -> Self {
        let (phase_tx, _) = watch::channel(BootstrapPhase::Initializing);
        Self {
            store,
            tokens,
            api,
            gate,
            config,
            initializers: Vec::new(),
            state: Mutex::new(PhaseState {
                phase: BootstrapPhase::Initializing,
                failure: None,
            }),
            running: AtomicBool::new(false),
            phase_tx,
            phase_listeners: ListenerRegistry::new(),
        }
    }

    /// Register a subsystem to start once the session is authenticated
    pub fn with_initializer(mut self, initializer: Arc<dyn DependentInitializer>) -> Self {
        self.initializers.push(initializer);
        self
    }

    pub fn store(&self) -> &AuthStateStore {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.lock_state().phase
    }

    /// Message recorded by the last failed run, cleared on the next transition
    pub fn failure_message(&self) -> Option<String> {
        self.lock_state().failure.clone()
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register a listener invoked synchronously on every phase transition
    pub fn on_phase_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&BootstrapPhase) + Send + Sync + 'static,
    {
        self.phase_listeners.add(listener)
    }

    pub fn remove_phase_listener(&self, id: ListenerId) -> bool {
        self.phase_listeners.remove(id)
    }

    /// Async view of the phase
    pub fn watch_phase(&self) -> watch::Receiver<BootstrapPhase> {
        self.phase_tx.subscribe()
    }

    /// Entry point, called once the app mounts.
    ///
    /// Waits for rehydration, then runs the sequence. Only runs from
    /// `Initializing`; calls while a run is in flight or after it settled
    /// are no-ops that return the current phase.
    pub async fn start(&self) -> BootstrapPhase {
        let phase = self.phase();
        if phase != BootstrapPhase::Initializing {
            tracing::debug!(%phase, "Bootstrap start ignored, already started");
            return phase;
        }

        let Some(guard) = RunGuard::acquire(self) else {
            tracing::debug!("Bootstrap start ignored, run in progress");
            return self.phase();
        };

        if !self.gate.is_complete() {
            tracing::debug!("Waiting for rehydration before bootstrap");
            self.gate.wait().await;
        }

        let phase = self.run().await;
        guard.finish();
        phase
    }

    /// Re-run the sequence after a failure. Only valid from `Failed`.
    pub async fn retry(&self) -> Result<BootstrapPhase> {
        let phase = self.phase();
        if phase != BootstrapPhase::Failed {
            return Err(SessionError::InvalidPhase {
                operation: "retry",
                phase: phase.to_string(),
            });
        }

        let Some(guard) = RunGuard::acquire(self) else {
            return Err(SessionError::InvalidPhase {
                operation: "retry",
                phase: self.phase().to_string(),
            });
        };

        tracing::info!("Retrying session bootstrap");
        self.gate.wait().await;
        let phase = self.run().await;
        guard.finish();
        Ok(phase)
    }

    /// Complete a login: persist the credential and publish the session.
    ///
    /// Used by the sign-in screens once the server accepted the user. Only
    /// valid once bootstrap is `Ready`.
    pub async fn sign_in(&self, credential: Credential, profile: UserProfile) -> Result<()> {
        let phase = self.phase();
        if phase != BootstrapPhase::Ready {
            return Err(SessionError::InvalidPhase {
                operation: "sign_in",
                phase: phase.to_string(),
            });
        }
        if credential.is_blank() {
            return Err(SessionError::InvalidResponse("Server issued an empty credential".into()));
        }

        self.tokens.set_token(&credential).await?;
        self.store.set(AuthSnapshot::authenticated(credential, profile));
        tracing::info!(user_id = ?self.store.get().user_id(), "Signed in");

        self.run_initializers().await;
        Ok(())
    }

    /// Sign out from any phase
    pub async fn sign_out(&self) -> Result<()> {
        self.store.sign_out(self.tokens.as_ref()).await
    }

    async fn run(&self) -> BootstrapPhase {
        // Any write that lands while this run is suspended supersedes it
        let revision = self.store.revision();

        self.transition(BootstrapPhase::CheckingToken, None);
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => return self.fail(&e),
        };

        let Some(credential) = token.filter(|c| !c.is_blank()) else {
            tracing::info!(class = ?FailureClass::NoCredential, "No stored credential");
            self.publish(revision, AuthSnapshot::unauthenticated());
            return self.transition(BootstrapPhase::Ready, None);
        };

        self.transition(BootstrapPhase::RestoringSession, None);
        let timeout = self.config.restore_timeout;
        let restored = match tokio::time::timeout(timeout, self.api.restore_session(&credential)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(timeout)),
        };

        match restored {
            Ok(profile) => {
                let published =
                    self.publish(revision, AuthSnapshot::authenticated(credential, profile));
                self.transition(BootstrapPhase::Ready, None);
                if published {
                    self.run_initializers().await;
                }
                BootstrapPhase::Ready
            }
            Err(e) => match e.classify_restore() {
                FailureClass::CredentialRejected => {
                    tracing::info!(
                        class = ?FailureClass::CredentialRejected,
                        "Stored credential rejected, continuing signed out"
                    );
                    self.publish(revision, AuthSnapshot::unauthenticated());
                    self.transition(BootstrapPhase::Ready, None)
                }
                _ => self.fail(&e),
            },
        }
    }

    /// Write the run's result unless the store moved on while we were suspended
    fn publish(&self, revision: u64, snapshot: AuthSnapshot) -> bool {
        let current = self.store.revision();
        if current != revision {
            tracing::info!(
                expected = revision,
                current,
                "Auth state changed during bootstrap, discarding restore result"
            );
            return false;
        }
        self.store.set(snapshot);
        true
    }

    fn fail(&self, error: &SessionError) -> BootstrapPhase {
        tracing::warn!(
            class = ?FailureClass::TransientRestoreFailure,
            error = %error,
            "Session bootstrap failed"
        );
        self.transition(BootstrapPhase::Failed, Some(error.to_string()))
    }

    fn transition(&self, to: BootstrapPhase, failure: Option<String>) -> BootstrapPhase {
        let from = {
            let mut state = self.lock_state();
            let from = state.phase;
            state.phase = to;
            state.failure = failure;
            from
        };

        tracing::info!(%from, %to, "Bootstrap phase transition");
        self.phase_tx.send_replace(to);
        self.phase_listeners.notify(&to);
        to
    }

    async fn run_initializers(&self) {
        for initializer in &self.initializers {
            match initializer.initialize().await {
                Ok(()) => tracing::debug!(initializer = initializer.name(), "Initializer started"),
                Err(e) => tracing::warn!(
                    initializer = initializer.name(),
                    error = %e,
                    "Dependent initializer failed"
                ),
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PhaseState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase())
            .field("running", &self.is_running())
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

/// Marks a run in flight. A run dropped after it left `Initializing` lands
/// in `Failed` so `retry()` can recover it; one dropped while still waiting
/// for rehydration leaves the phase untouched.
struct RunGuard<'a> {
    controller: &'a SessionController,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn acquire(controller: &'a SessionController) -> Option<Self> {
        controller
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                controller,
                finished: false,
            })
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let phase = self.controller.phase();
        if !self.finished && !phase.is_terminal() && phase != BootstrapPhase::Initializing {
            self.controller.transition(
                BootstrapPhase::Failed,
                Some("Session bootstrap was interrupted".to_string()),
            );
        }
        self.controller.running.store(false, Ordering::SeqCst);
    }
}

//! Optimistic toggle actions
//!
//! One `OptimisticAction` per on-screen control (e.g. the save button of a
//! post). Taps flip the value immediately and reconcile with the server:
//!
//! ```text
//! Idle(confirmed) --tap--> Pending(!confirmed) --ok--> Idle(!confirmed)
//!                                              --err-> Idle(confirmed)
//! ```
//!
//! Sync failures never escape the action; they roll back and are logged.

use crate::auth::AuthStateStore;
use crate::error::FailureClass;
use crate::navigation::SIGN_IN_SCREEN;
use crate::traits::ToggleRemote;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A two-state value an action can flip
pub trait Toggle: Clone + Debug + PartialEq + Send + Sync + 'static {
    fn toggled(&self) -> Self;
}

impl Toggle for bool {
    fn toggled(&self) -> Self {
        !*self
    }
}

/// Result of a tap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractOutcome<T> {
    /// Signed out: nothing changed, send the user to this screen
    RequiresSignIn { screen: &'static str },
    /// A call is already in flight or the control is gone
    Ignored,
    /// Server accepted the new value
    Committed(T),
    /// Server call failed, prior value restored
    RolledBack(T),
    /// Control unmounted before the call settled; local state left alone
    Abandoned,
}

#[derive(Debug)]
struct ActionState<T> {
    confirmed: T,
    pending: Option<T>,
    in_flight: bool,
    /// Bumped on every tap, lets a slow status check notice it is stale
    interactions: u64,
}

/// Per-control optimistic state machine
pub struct OptimisticAction<T: Toggle> {
    entity_id: u64,
    state: Mutex<ActionState<T>>,
    mounted: AtomicBool,
    remote: Arc<dyn ToggleRemote<T>>,
    auth: AuthStateStore,
}

/// Save/unsave of a post
pub type SaveAction = OptimisticAction<bool>;

impl<T: Toggle> OptimisticAction<T> {
    /// Create the action for a freshly rendered control.
    ///
    /// `initial` is only a first paint; [`Self::mount`] replaces it with the
    /// server's answer when one is available.
    pub fn new(
        entity_id: u64,
        initial: T,
        remote: Arc<dyn ToggleRemote<T>>,
        auth: AuthStateStore,
    ) -> Self {
        Self {
            entity_id,
            state: Mutex::new(ActionState {
                confirmed: initial,
                pending: None,
                in_flight: false,
                interactions: 0,
            }),
            mounted: AtomicBool::new(true),
            remote,
            auth,
        }
    }

    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }

    /// Value to render: pending if a call is in flight, else confirmed
    pub fn value(&self) -> T {
        let state = self.lock();
        state.pending.clone().unwrap_or_else(|| state.confirmed.clone())
    }

    pub fn confirmed(&self) -> T {
        self.lock().confirmed.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Whether a tap would reach the server
    pub fn is_interactive(&self) -> bool {
        self.is_mounted() && !self.is_in_flight()
    }

    /// Background status check, run once the control is on screen.
    ///
    /// Returns the server value if it was applied. Skipped when signed out
    /// or while a toggle is in flight; failures keep the seeded value. The
    /// answer is dropped if a tap happened while it was in flight or the
    /// control unmounted.
    pub async fn mount(&self) -> Option<T> {
        if !self.auth.is_authenticated() {
            return None;
        }

        let seen = {
            let state = self.lock();
            if state.in_flight {
                tracing::debug!(entity_id = self.entity_id, "Toggle in flight, status check skipped");
                return None;
            }
            state.interactions
        };
        let status = match self.remote.check_status(self.entity_id).await {
            Ok(status) => status?,
            Err(e) => {
                tracing::debug!(
                    entity_id = self.entity_id,
                    class = ?FailureClass::ActionSyncFailure,
                    error = %e,
                    "Status check failed, keeping seeded value"
                );
                return None;
            }
        };

        if !self.is_mounted() {
            return None;
        }

        let mut state = self.lock();
        if state.in_flight || state.interactions != seen {
            tracing::debug!(entity_id = self.entity_id, "Toggle raced status check, server value ignored");
            return None;
        }
        state.confirmed = status.clone();
        Some(status)
    }

    /// Handle a tap on the control
    pub async fn interact(&self) -> InteractOutcome<T> {
        if !self.is_mounted() {
            return InteractOutcome::Ignored;
        }
        if !self.auth.is_authenticated() {
            tracing::debug!(entity_id = self.entity_id, "Action requires sign-in");
            return InteractOutcome::RequiresSignIn {
                screen: SIGN_IN_SCREEN,
            };
        }

        let (previous, optimistic) = {
            let mut state = self.lock();
            if !self.is_mounted() || state.in_flight {
                return InteractOutcome::Ignored;
            }
            let optimistic = state.confirmed.toggled();
            state.pending = Some(optimistic.clone());
            state.in_flight = true;
            state.interactions += 1;
            (state.confirmed.clone(), optimistic)
        };
        let guard = InFlight { action: self };

        let result = self.remote.toggle(self.entity_id).await;
        guard.settle();

        if !self.is_mounted() {
            tracing::debug!(entity_id = self.entity_id, "Control unmounted, toggle result dropped");
            return InteractOutcome::Abandoned;
        }

        let mut state = self.lock();
        state.pending = None;
        state.in_flight = false;
        match result {
            Ok(()) => {
                state.confirmed = optimistic.clone();
                InteractOutcome::Committed(optimistic)
            }
            Err(e) => {
                tracing::warn!(
                    entity_id = self.entity_id,
                    class = ?FailureClass::ActionSyncFailure,
                    error = %e,
                    restored = ?previous,
                    "Toggle failed, rolled back"
                );
                state.confirmed = previous.clone();
                InteractOutcome::RolledBack(previous)
            }
        }
    }

    /// The control left the screen; pending results are dropped
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, ActionState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Toggle> Debug for OptimisticAction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticAction")
            .field("entity_id", &self.entity_id)
            .field("state", &*self.lock())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Rolls back the pending value if the tap future is dropped mid-call
struct InFlight<'a, T: Toggle> {
    action: &'a OptimisticAction<T>,
}

impl<T: Toggle> InFlight<'_, T> {
    fn settle(self) {
        std::mem::forget(self);
    }
}

impl<T: Toggle> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.action.is_mounted() {
            let mut state = self.action.lock();
            state.pending = None;
            state.in_flight = false;
        }
    }
}

//! Scripted fakes for the remote seams

use crate::auth::{Credential, UserProfile};
use crate::error::{Result, SessionError};
use crate::traits::{DependentInitializer, SessionApi, ToggleRemote};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub(crate) fn profile(id: u64, username: &str) -> UserProfile {
    UserProfile {
        id,
        username: username.to_string(),
        email: format!("{username}@example.org"),
        display_name: String::new(),
        bio: String::new(),
        profile_image_url: String::new(),
        role: "user".to_string(),
    }
}

/// Lets a test hold calls open and observe when they start
#[derive(Default)]
struct CallGate {
    release: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
}

impl CallGate {
    fn held() -> Self {
        Self {
            release: Some(Arc::new(Semaphore::new(0))),
            entered: Arc::new(Notify::new()),
        }
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Some(release) = &self.release {
            if let Ok(permit) = release.acquire().await {
                permit.forget();
            }
        }
    }

    fn release(&self) {
        if let Some(release) = &self.release {
            release.add_permits(1);
        }
    }
}

enum RestoreStep {
    Respond(Result<UserProfile>),
    Hang,
}

/// Session API that replays queued outcomes in order
#[derive(Default)]
pub(crate) struct ScriptedSessionApi {
    steps: Mutex<VecDeque<RestoreStep>>,
    gate: CallGate,
    calls: AtomicUsize,
    seen: Mutex<Vec<Credential>>,
}

impl ScriptedSessionApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, outcome: Result<UserProfile>) -> Self {
        self.steps.lock().unwrap().push_back(RestoreStep::Respond(outcome));
        self
    }

    /// Next call never settles
    pub(crate) fn hang(self) -> Self {
        self.steps.lock().unwrap().push_back(RestoreStep::Hang);
        self
    }

    /// Every call waits for [`Self::release`]
    pub(crate) fn held(mut self) -> Self {
        self.gate = CallGate::held();
        self
    }

    pub(crate) fn release(&self) {
        self.gate.release();
    }

    /// Resolves once a call has started
    pub(crate) async fn entered(&self) {
        self.gate.entered.notified().await;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn credentials_seen(&self) -> Vec<Credential> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionApi for ScriptedSessionApi {
    async fn restore_session(&self, credential: &Credential) -> Result<UserProfile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(credential.clone());
        self.gate.pass().await;

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(RestoreStep::Respond(outcome)) => outcome,
            Some(RestoreStep::Hang) => std::future::pending().await,
            None => Err(SessionError::Network("no scripted response".into())),
        }
    }
}

/// Toggle remote with a fixed status answer and queued toggle outcomes
pub(crate) struct GatedToggleRemote {
    status: Mutex<Result<Option<bool>>>,
    outcomes: Mutex<VecDeque<Result<()>>>,
    gate: CallGate,
    status_gate: CallGate,
    status_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
}

impl GatedToggleRemote {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(Ok(None)),
            outcomes: Mutex::new(VecDeque::new()),
            gate: CallGate::default(),
            status_gate: CallGate::default(),
            status_calls: AtomicUsize::new(0),
            toggle_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_status(self, status: Result<Option<bool>>) -> Self {
        *self.status.lock().unwrap() = status;
        self
    }

    pub(crate) fn then(self, outcome: Result<()>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    /// Toggle calls wait for [`Self::release`]
    pub(crate) fn held(mut self) -> Self {
        self.gate = CallGate::held();
        self
    }

    /// Status checks wait for [`Self::release_status`]
    pub(crate) fn held_status(mut self) -> Self {
        self.status_gate = CallGate::held();
        self
    }

    pub(crate) fn release(&self) {
        self.gate.release();
    }

    pub(crate) fn release_status(&self) {
        self.status_gate.release();
    }

    pub(crate) async fn entered(&self) {
        self.gate.entered.notified().await;
    }

    pub(crate) async fn status_entered(&self) {
        self.status_gate.entered.notified().await;
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToggleRemote<bool> for GatedToggleRemote {
    async fn check_status(&self, _entity_id: u64) -> Result<Option<bool>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_gate.pass().await;
        self.status.lock().unwrap().clone()
    }

    async fn toggle(&self, _entity_id: u64) -> Result<()> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        let outcome = self.outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or(Ok(()))
    }
}

/// Initializer that counts its invocations
pub(crate) struct CountingInitializer {
    name: String,
    count: AtomicUsize,
    fail: bool,
}

impl CountingInitializer {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            count: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependentInitializer for CountingInitializer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SessionError::Network("badge service unreachable".into()));
        }
        Ok(())
    }
}

//! Navigation gate
//!
//! Derives which screen graph is mounted from the bootstrap phase and the
//! auth snapshot. The decision is recomputed synchronously on every store
//! write and phase transition, never cached apart from its inputs.

use crate::auth::AuthSnapshot;
use crate::listeners::ListenerId;
use crate::navigation::routes::{ScreenGraph, MAIN_TABS};
use crate::session::{BootstrapPhase, SessionController};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;

const DEFAULT_FAILURE: &str = "Could not restore your session";

/// What the root of the app renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    /// Bootstrap still running, no graph decision yet
    Loading,
    /// Bootstrap failed, offer retry
    Error { message: String },
    Graph(ScreenGraph),
}

impl GateView {
    pub fn graph(&self) -> Option<ScreenGraph> {
        match self {
            Self::Graph(graph) => Some(*graph),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl std::fmt::Display for GateView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Error { message } => write!(f, "error: {}", message),
            Self::Graph(graph) => write!(f, "{} graph", graph),
        }
    }
}

/// Map bootstrap state to a view. Only `Ready` ever yields a graph.
pub fn evaluate(phase: BootstrapPhase, snapshot: &AuthSnapshot, failure: Option<&str>) -> GateView {
    match phase {
        BootstrapPhase::Initializing
        | BootstrapPhase::CheckingToken
        | BootstrapPhase::RestoringSession => GateView::Loading,
        BootstrapPhase::Failed => GateView::Error {
            message: failure.unwrap_or(DEFAULT_FAILURE).to_string(),
        },
        BootstrapPhase::Ready if snapshot.is_authenticated() => {
            GateView::Graph(ScreenGraph::Authenticated)
        }
        BootstrapPhase::Ready => GateView::Graph(ScreenGraph::Unauthenticated),
    }
}

/// Navigation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No screen graph is mounted ({0})")]
    NoGraph(String),

    #[error("Screen `{screen}` is not part of the {graph} graph")]
    UnknownScreen { screen: String, graph: ScreenGraph },

    #[error("Unknown tab `{0}`")]
    UnknownTab(String),
}

#[derive(Debug)]
struct NavState {
    view: GateView,
    stack: Vec<&'static str>,
    tab: Option<&'static str>,
}

impl NavState {
    fn apply(&mut self, view: GateView) {
        if view == self.view {
            return;
        }

        let from = self.view.graph();
        let to = view.graph();
        if from != to {
            // Nothing from the previous graph survives a switch
            self.stack = to.map(|g| vec![g.entry_screen()]).unwrap_or_default();
            self.tab = to.filter(ScreenGraph::has_tabs).map(|_| MAIN_TABS[0]);
            tracing::info!(from = ?from, to = ?to, "Screen graph switched, stack reset");
        }
        self.view = view;
    }

    fn mounted_graph(&self) -> Result<ScreenGraph, NavigationError> {
        self.view
            .graph()
            .ok_or_else(|| NavigationError::NoGraph(self.view.to_string()))
    }
}

/// Root navigator bound to a [`SessionController`].
///
/// Unsubscribes from the controller when dropped.
pub struct NavigationGate {
    state: Arc<Mutex<NavState>>,
    controller: Weak<SessionController>,
    store_listener: ListenerId,
    phase_listener: ListenerId,
}

impl NavigationGate {
    pub fn bind(controller: &Arc<SessionController>) -> Self {
        let state = Arc::new(Mutex::new(NavState {
            view: GateView::Loading,
            stack: Vec::new(),
            tab: None,
        }));

        let refresh: Arc<dyn Fn() + Send + Sync> = {
            let state = state.clone();
            let weak = Arc::downgrade(controller);
            Arc::new(move || {
                if let Some(controller) = weak.upgrade() {
                    let view = current_view(&controller);
                    lock(&state).apply(view);
                }
            })
        };

        let on_store = refresh.clone();
        let store_listener = controller.store().subscribe(move |_| on_store());
        let on_phase = refresh.clone();
        let phase_listener = controller.on_phase_change(move |_| on_phase());
        refresh();

        Self {
            state,
            controller: Arc::downgrade(controller),
            store_listener,
            phase_listener,
        }
    }

    pub fn view(&self) -> GateView {
        self.lock().view.clone()
    }

    pub fn graph(&self) -> Option<ScreenGraph> {
        self.lock().view.graph()
    }

    /// Screens from the graph entry to the top
    pub fn stack(&self) -> Vec<&'static str> {
        self.lock().stack.clone()
    }

    pub fn current_screen(&self) -> Option<&'static str> {
        self.lock().stack.last().copied()
    }

    pub fn active_tab(&self) -> Option<&'static str> {
        self.lock().tab
    }

    /// Open a screen of the mounted graph on top of the stack
    pub fn push(&self, screen: &str) -> Result<(), NavigationError> {
        let mut state = self.lock();
        let graph = state.mounted_graph()?;
        let resolved = graph
            .screen(screen)
            .filter(|s| *s != graph.entry_screen())
            .ok_or_else(|| NavigationError::UnknownScreen {
                screen: screen.to_string(),
                graph,
            })?;

        state.stack.push(resolved);
        tracing::debug!(screen = resolved, depth = state.stack.len(), "Pushed screen");
        Ok(())
    }

    /// Close the top screen. The graph entry is never popped.
    pub fn pop(&self) -> Option<&'static str> {
        let mut state = self.lock();
        if state.stack.len() <= 1 {
            return None;
        }
        state.stack.pop()
    }

    /// Switch main tab, closing any overlays above the tab navigator
    pub fn select_tab(&self, tab: &str) -> Result<(), NavigationError> {
        let mut state = self.lock();
        let graph = state.mounted_graph()?;
        if !graph.has_tabs() {
            return Err(NavigationError::UnknownTab(tab.to_string()));
        }
        let resolved = MAIN_TABS
            .iter()
            .copied()
            .find(|t| *t == tab)
            .ok_or_else(|| NavigationError::UnknownTab(tab.to_string()))?;

        state.stack.truncate(1);
        state.tab = Some(resolved);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        lock(&self.state)
    }
}

impl Drop for NavigationGate {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.upgrade() {
            controller.store().unsubscribe(self.store_listener);
            controller.remove_phase_listener(self.phase_listener);
        }
    }
}

impl std::fmt::Debug for NavigationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("NavigationGate")
            .field("view", &state.view)
            .field("stack", &state.stack)
            .field("tab", &state.tab)
            .finish()
    }
}

fn current_view(controller: &SessionController) -> GateView {
    let failure = controller.failure_message();
    evaluate(controller.phase(), &controller.store().get(), failure.as_deref())
}

fn lock(state: &Mutex<NavState>) -> MutexGuard<'_, NavState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

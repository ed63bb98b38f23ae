//! Civic Session - session bootstrap and auth-gated navigation
//!
//! The startup core of the civic client: decides, once persisted state is
//! rehydrated, whether the user lands signed in or signed out, and keeps
//! the mounted screen graph consistent with that decision.
//!
//! # Architecture
//!
//! ```text
//! RehydrationGate ─▶ SessionController ─▶ TokenStore
//!                          │          └─▶ SessionApi (restore)
//!                          ▼
//!                    AuthStateStore ─▶ NavigationGate
//!                          │
//!                          └─▶ OptimisticAction (per control)
//! ```
//!
//! - **Bootstrap**: phase machine `Initializing → CheckingToken →
//!   RestoringSession → Ready | Failed`, retry from `Failed` only
//! - **Auth state**: one atomic snapshot, synchronous subscribers
//! - **Navigation**: loading, error or exactly one of two screen graphs
//! - **Optimistic actions**: instant toggles reconciled with the server
//!
//! # Example
//!
//! ```rust,ignore
//! use civic_session::*;
//! use std::sync::Arc;
//!
//! let store = AuthStateStore::new();
//! let api = Arc::new(HttpApiClient::new(ApiConfig::default(), store.clone())?);
//! let tokens = Arc::new(FileTokenStore::new("session.json"));
//! let gate = RehydrationGate::new();
//!
//! let controller = Arc::new(SessionController::new(
//!     store, tokens.clone(), api, gate.clone(), SessionConfig::default(),
//! ));
//! let navigation = NavigationGate::bind(&controller);
//!
//! tokens.rehydrate().await?;
//! gate.complete();
//! controller.start().await;
//! println!("{}", navigation.view());
//! ```

// Seams to external collaborators
pub mod traits;

// Auth snapshot and store
pub mod auth;

// Rehydration, token storage and the bootstrap controller
pub mod session;

// Screen graph selection
pub mod navigation;

// Optimistic toggle actions
pub mod optimistic;

// HTTP client
#[cfg(feature = "client")]
pub mod client;

pub mod config;
pub mod error;
mod listeners;

#[cfg(test)]
mod test_support;

pub use traits::{DependentInitializer, SessionApi, ToggleRemote, TokenStore};

pub use auth::{AuthSnapshot, AuthStateStore, AuthenticatedSession, Credential, SnapshotView, UserProfile};

pub use session::{BootstrapPhase, FileTokenStore, MemoryTokenStore, RehydrationGate, SessionController};

pub use navigation::{GateView, NavigationError, NavigationGate, ScreenGraph};

pub use optimistic::{InteractOutcome, OptimisticAction, SaveAction, Toggle};

#[cfg(feature = "client")]
pub use client::{HttpApiClient, SaveStatusResponse};

pub use config::{ApiConfig, SessionConfig};

pub use error::{FailureClass, Result, SessionError};

pub use listeners::ListenerId;

//! Session lifecycle: rehydration, credential storage and startup bootstrap

mod bootstrap;
mod rehydrate;
mod token_store;

pub use bootstrap::{BootstrapPhase, SessionController};
pub use rehydrate::RehydrationGate;
pub use token_store::{FileTokenStore, MemoryTokenStore};

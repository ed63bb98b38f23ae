//! Authentication state
//!
//! The snapshot model and the store that holds it for the life of the process.

mod snapshot;
mod store;

pub use snapshot::{AuthSnapshot, AuthenticatedSession, Credential, SnapshotView, UserProfile};
pub use store::AuthStateStore;

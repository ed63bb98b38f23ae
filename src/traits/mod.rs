//! Seams to the collaborators the session core does not own
//!
//! Token storage, the remote session and save endpoints, and the
//! subsystems that start once a user is signed in.

mod remote;
mod token;

pub use remote::{DependentInitializer, SessionApi, ToggleRemote};
pub use token::TokenStore;

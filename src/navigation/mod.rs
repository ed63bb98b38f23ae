//! Auth-gated navigation

mod gate;
mod routes;

pub use gate::{evaluate, GateView, NavigationError, NavigationGate};
pub use routes::{
    ScreenGraph, AUTHENTICATED_SCREENS, MAIN_TABS, SIGN_IN_SCREEN, UNAUTHENTICATED_SCREENS,
};

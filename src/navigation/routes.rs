//! Screen graph tables

use serde::Serialize;

/// Unauthenticated graph screens, entry first
pub const UNAUTHENTICATED_SCREENS: &[&str] =
    &["Landing", "Login", "Register", "VerifyEmail", "Verify", "Debug"];

/// Authenticated graph screens: the tab navigator plus its overlays
pub const AUTHENTICATED_SCREENS: &[&str] = &[
    "MainTabs",
    "UserProfile",
    "Settings",
    "FollowRequests",
    "CommunityDetail",
    "CreateCommunity",
    "PostDetail",
    "SavedPosts",
    "PoliticianDetail",
    "Hashtag",
    "Debug",
    "OAuthConnectSuccess",
];

/// Tabs of the `MainTabs` navigator, default first
pub const MAIN_TABS: &[&str] = &["Feed", "Communities", "Map", "Politicians", "Profile"];

/// Where actions that need an account send a signed-out user
pub const SIGN_IN_SCREEN: &str = "Login";

/// One of the two mutually exclusive screen graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenGraph {
    Unauthenticated,
    Authenticated,
}

impl ScreenGraph {
    pub fn screens(&self) -> &'static [&'static str] {
        match self {
            Self::Unauthenticated => UNAUTHENTICATED_SCREENS,
            Self::Authenticated => AUTHENTICATED_SCREENS,
        }
    }

    /// Screen shown when the graph is entered
    pub fn entry_screen(&self) -> &'static str {
        self.screens()[0]
    }

    /// Resolve a screen name to the graph's static entry
    pub fn screen(&self, name: &str) -> Option<&'static str> {
        self.screens().iter().copied().find(|s| *s == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.screen(name).is_some()
    }

    pub fn has_tabs(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl std::fmt::Display for ScreenGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_screens() {
        assert_eq!(ScreenGraph::Unauthenticated.entry_screen(), "Landing");
        assert_eq!(ScreenGraph::Authenticated.entry_screen(), "MainTabs");
        assert!(ScreenGraph::Unauthenticated.contains(SIGN_IN_SCREEN));
    }

    #[test]
    fn test_graphs_only_share_the_debug_screen() {
        let shared: Vec<_> = UNAUTHENTICATED_SCREENS
            .iter()
            .filter(|s| AUTHENTICATED_SCREENS.contains(s))
            .collect();
        assert_eq!(shared, vec![&"Debug"]);
        assert!(!ScreenGraph::Unauthenticated.contains("Settings"));
        assert!(!ScreenGraph::Authenticated.contains("Login"));
    }
}

//! Authentication snapshot
//!
//! The identity fields are nullable only as a unit: a snapshot either holds
//! a credential together with a complete profile, or nothing at all.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque session credential.
///
/// Presence alone does not prove the session is valid. `Debug` never prints
/// the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value, for the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} chars>)", self.0.len())
    }
}

/// Profile returned by the session restore endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Falls back to the username when the server sends none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bio: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profile_image_url: String,
    pub role: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl UserProfile {
    /// Fill fields the server may omit so every identity field is present
    pub fn normalized(mut self) -> Self {
        if self.display_name.trim().is_empty() {
            self.display_name = self.username.clone();
        }
        self
    }
}

/// An established session: credential plus the identity it proved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub credential: Credential,
    pub profile: UserProfile,
}

/// Complete authentication state, written to the store as one value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthSnapshot {
    session: Option<AuthenticatedSession>,
}

impl AuthSnapshot {
    /// The signed-out snapshot: not authenticated, every identity field null
    pub fn unauthenticated() -> Self {
        Self { session: None }
    }

    pub fn authenticated(credential: Credential, profile: UserProfile) -> Self {
        Self {
            session: Some(AuthenticatedSession {
                credential,
                profile: profile.normalized(),
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AuthenticatedSession> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.profile)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.session.as_ref().map(|s| &s.credential)
    }

    pub fn user_id(&self) -> Option<u64> {
        self.profile().map(|p| p.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.profile().map(|p| p.username.as_str())
    }

    /// Flat view with nullable fields, the shape screens read
    pub fn view(&self) -> SnapshotView {
        match self.profile() {
            Some(p) => SnapshotView {
                is_authenticated: true,
                id: Some(p.id),
                username: Some(p.username.clone()),
                email: Some(p.email.clone()),
                display_name: Some(p.display_name.clone()),
                bio: Some(p.bio.clone()),
                profile_image_url: Some(p.profile_image_url.clone()),
                role: Some(p.role.clone()),
            },
            None => SnapshotView::default(),
        }
    }
}

/// Serializable flat projection of an [`AuthSnapshot`]; never contains the credential
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub is_authenticated: bool,
    pub id: Option<u64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Option<String>,
}

impl SnapshotView {
    /// Authenticated iff every identity field is present
    pub fn is_consistent(&self) -> bool {
        let all_present = self.id.is_some()
            && self.username.is_some()
            && self.email.is_some()
            && self.display_name.is_some()
            && self.bio.is_some()
            && self.profile_image_url.is_some()
            && self.role.is_some();
        let all_absent = self.id.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.display_name.is_none()
            && self.bio.is_none()
            && self.profile_image_url.is_none()
            && self.role.is_none();

        if self.is_authenticated {
            all_present
        } else {
            all_absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: 7,
            username: "abc".into(),
            email: "abc@example.com".into(),
            display_name: String::new(),
            bio: String::new(),
            profile_image_url: String::new(),
            role: "user".into(),
        }
    }

    #[test]
    fn test_unauthenticated_view_is_all_null() {
        let view = AuthSnapshot::unauthenticated().view();
        assert!(!view.is_authenticated);
        assert!(view.is_consistent());
        assert_eq!(view, SnapshotView::default());
    }

    #[test]
    fn test_authenticated_view_is_complete() {
        let snapshot = AuthSnapshot::authenticated(Credential::new("t0k"), profile());
        let view = snapshot.view();

        assert!(view.is_authenticated);
        assert!(view.is_consistent());
        assert_eq!(view.id, Some(7));
        assert_eq!(view.display_name.as_deref(), Some("abc"));
        assert_eq!(snapshot.credential().map(|c| c.expose()), Some("t0k"));
    }

    #[test]
    fn test_profile_deserialization_fills_optional_fields() {
        let json = r#"{
            "id": 7,
            "username": "abc",
            "email": "abc@example.com",
            "displayName": null,
            "role": "user"
        }"#;

        let parsed: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.bio, "");
        assert_eq!(parsed.profile_image_url, "");
        assert_eq!(parsed.normalized().display_name, "abc");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let debug = format!("{:?}", Credential::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }
}

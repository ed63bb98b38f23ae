//! HTTP client for the civic API
//!
//! Implements session restore and the post save toggle. Non-success
//! statuses come back as `SessionError::Remote` with the status intact, so
//! a 401 can be told apart from transport failures.

use crate::auth::{AuthStateStore, Credential, UserProfile};
use crate::config::ApiConfig;
use crate::error::{Result, SessionError, UNAUTHORIZED};
use crate::traits::{SessionApi, ToggleRemote};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of `GET /posts/{id}/save-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatusResponse {
    pub is_saved: bool,
}

/// `GET /users/me` answers either with the profile or wrapped in `user`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MeResponse {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl MeResponse {
    fn into_profile(self) -> UserProfile {
        match self {
            Self::Wrapped { user } => user,
            Self::Bare(profile) => profile,
        }
    }
}

/// HTTP client for the civic API
///
/// ```rust,no_run
/// use civic_session::{ApiConfig, AuthStateStore, Credential, HttpApiClient, SessionApi};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpApiClient::new(ApiConfig::new("http://localhost:3000/api"), AuthStateStore::new())?;
/// let profile = client.restore_session(&Credential::new("stored-token")).await?;
/// println!("restored {}", profile.username);
/// # Ok(())
/// # }
/// ```
pub struct HttpApiClient {
    config: ApiConfig,
    client: Client,
    auth: AuthStateStore,
}

impl HttpApiClient {
    /// `auth` supplies the bearer credential for calls made on behalf of
    /// the signed-in user
    pub fn new(config: ApiConfig, auth: AuthStateStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SessionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            auth,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base(), path.trim_start_matches('/'))
    }

    fn with_bearer(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", credential.expose()),
        )
    }

    fn current_credential(&self) -> Result<Credential> {
        self.auth
            .get()
            .credential()
            .cloned()
            .ok_or_else(|| SessionError::remote(UNAUTHORIZED, "Not signed in"))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SessionError::InvalidResponse(e.to_string()))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Remote {
                status,
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SessionApi for HttpApiClient {
    async fn restore_session(&self, credential: &Credential) -> Result<UserProfile> {
        let url = self.url("users/me");
        tracing::debug!(%url, "Restoring session");

        let response = Self::with_bearer(self.client.get(&url), credential)
            .send()
            .await?;
        let me: MeResponse = self.handle_response(response).await?;
        Ok(me.into_profile())
    }
}

#[async_trait]
impl ToggleRemote<bool> for HttpApiClient {
    async fn check_status(&self, entity_id: u64) -> Result<Option<bool>> {
        let credential = self.current_credential()?;
        let url = self.url(&format!("posts/{}/save-status", entity_id));

        let response = Self::with_bearer(self.client.get(&url), &credential)
            .send()
            .await?;
        let status: SaveStatusResponse = self.handle_response(response).await?;
        Ok(Some(status.is_saved))
    }

    async fn toggle(&self, entity_id: u64) -> Result<()> {
        let credential = self.current_credential()?;
        let url = self.url(&format!("posts/{}/save", entity_id));

        let response = Self::with_bearer(self.client.post(&url), &credential)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpApiClient {
        HttpApiClient::new(ApiConfig::new("http://localhost:3000/api/"), AuthStateStore::new()).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client();
        assert_eq!(client.url("users/me"), "http://localhost:3000/api/users/me");
        assert_eq!(client.url("/posts/5/save"), "http://localhost:3000/api/posts/5/save");
    }

    #[test]
    fn test_save_status_is_camel_case() {
        let status: SaveStatusResponse = serde_json::from_str(r#"{"isSaved": true}"#).unwrap();
        assert!(status.is_saved);
        assert!(serde_json::from_str::<SaveStatusResponse>(r#"{"is_saved": true}"#).is_err());
    }

    #[test]
    fn test_me_response_accepts_both_shapes() {
        let bare = r#"{"id": 7, "username": "abc", "email": "abc@example.org", "role": "user"}"#;
        let wrapped = format!(r#"{{"user": {}}}"#, bare);

        let a = serde_json::from_str::<MeResponse>(bare).unwrap().into_profile();
        let b = serde_json::from_str::<MeResponse>(&wrapped).unwrap().into_profile();
        assert_eq!(a, b);
        assert_eq!(a.id, 7);
    }

    #[tokio::test]
    async fn test_save_calls_need_a_session() {
        let client = client();
        let err = client.toggle(5).await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}

//! User profiles table client

use reqwest::Method;

use crate::config::BackendConfig;
use crate::data::{expect_success, into_api_error, RestClient};
use crate::error::Result;
use crate::models::{UserId, UserProfile};

/// PostgREST-backed client for the `users` profile table.
#[derive(Clone)]
pub struct ProfilesClient {
    rest: RestClient,
}

impl ProfilesClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    /// Clone of this client authorized as the given signed-in user.
    #[must_use]
    pub fn with_access_token(&self, access_token: &str) -> Self {
        Self {
            rest: self.rest.with_access_token(access_token),
        }
    }

    /// Fetch a profile row; `None` when the user has no profile yet.
    pub async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let response = self
            .rest
            .request(Method::GET, "users")
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }

        let mut rows = response.json::<Vec<UserProfile>>().await?;
        Ok(rows.pop())
    }

    /// Point the profile at a new avatar object, or clear it with `None`.
    pub async fn set_avatar_path(&self, user_id: &UserId, path: Option<&str>) -> Result<()> {
        let response = self
            .rest
            .request(Method::PATCH, "users")
            .query(&[("id", format!("eq.{user_id}"))])
            .json(&serde_json::json!({ "avatar_path": path }))
            .send()
            .await?;
        expect_success(response).await
    }
}

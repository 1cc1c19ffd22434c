//! PostgREST data clients for the managed backend's tables.
//!
//! Each table gets its own thin client over the shared [`RestClient`]
//! plumbing. Write operations are authorized by row-level security, so
//! clients can be rebound to a signed-in user's access token with
//! `with_access_token`.

pub mod favorites;
pub mod listings;
pub mod users;

pub use favorites::{FavoritesClient, FavoritesRepository};
pub use listings::{ListingsClient, ListingsRepository};
pub use users::ProfilesClient;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::util::compact_text;

/// Postgres unique-constraint violation, surfaced by PostgREST in error bodies.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Shared request plumbing for the PostgREST endpoint.
#[derive(Clone)]
pub(crate) struct RestClient {
    rest_url: String,
    anon_key: String,
    bearer: Option<String>,
    client: reqwest::Client,
}

impl RestClient {
    pub(crate) fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.anon_key().to_string(),
            bearer: None,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Clone of this client authorized as the given signed-in user.
    pub(crate) fn with_access_token(&self, access_token: &str) -> Self {
        let mut client = self.clone();
        client.bearer = Some(access_token.trim().to_string());
        client
    }

    /// Start a request against a table path, with auth headers applied.
    ///
    /// Anonymous clients authorize as the anon role; token-bound clients as
    /// the signed-in user.
    pub(crate) fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self.bearer.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }
}

/// Convert a non-success PostgREST response into an [`Error`].
///
/// Duplicate-key violations get their own variant so callers can treat
/// "already present" as satisfied rather than failed.
pub(crate) async fn into_api_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let parsed = serde_json::from_str::<RestErrorBody>(&body).ok();
    let code = parsed.as_ref().and_then(|payload| payload.code.clone());
    let message = parsed
        .and_then(|payload| payload.message.or(payload.details))
        .unwrap_or_else(|| compact_text(&body));
    let rendered = if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", message.trim(), status.as_u16())
    };

    if status == StatusCode::CONFLICT || code.as_deref() == Some(PG_UNIQUE_VIOLATION) {
        Error::Constraint(rendered)
    } else {
        Error::Api(rendered)
    }
}

/// Check a write response, discarding the body.
pub(crate) async fn expect_success(response: Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(into_api_error(response).await)
    }
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_error_body_parses_postgrest_shape() {
        let raw = r#"{
            "code": "23505",
            "details": "Key (user_id, listing_id) already exists.",
            "message": "duplicate key value violates unique constraint"
        }"#;
        let parsed: RestErrorBody = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.code.as_deref(), Some("23505"));
        assert!(parsed.message.unwrap().contains("duplicate key"));
    }
}

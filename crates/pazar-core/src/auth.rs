//! Supabase auth client shared by every app surface.
//!
//! Wraps the GoTrue HTTP API: email/password sign-up and sign-in, session
//! refresh and restore, sign-out, and password recovery. Session persistence
//! is delegated to a [`SessionPersistence`] implementation so each surface
//! can pick its own secure store.

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::util::{compact_text, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Authenticated account identity as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    /// Display name carried in the account's user metadata.
    pub username: Option<String>,
}

/// An issued session with its token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up attempt.
///
/// Projects with email confirmation enabled return no session until the
/// address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Seam for storing the active session in platform-appropriate secure storage.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(config: &BackendConfig, store: S) -> AuthResult<Self> {
        Ok(Self {
            auth_url: config.auth_url(),
            anon_key: config.anon_key().to_string(),
            client: Client::builder().build()?,
            store,
        })
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A failed refresh clears the stored session rather than erroring: a
    /// stale refresh token just means the user has to sign in again.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    /// Register a new account; the username travels as user metadata.
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<SignUpOutcome> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidCredentials("username is required"));
        }
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "username": username },
        });
        let request = self.anon_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let payload = self.send_session_request(request).await?;
        match payload.resolve()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let request = self.anon_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let payload = self.send_session_request(request).await?;
        let session = payload.resolve()?.ok_or_else(|| {
            AuthError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidCredentials("refresh token is required"));
        }

        let payload = serde_json::json!({ "refresh_token": refresh_token });
        let request = self.anon_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let payload = self.send_session_request(request).await?;
        let session = payload.resolve()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    /// Revoke the session server-side and clear the stored copy.
    ///
    /// An already-invalid token (HTTP 401) still counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()?;
        Ok(())
    }

    /// Send a password recovery email.
    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::InvalidCredentials("email is required"));
        }

        let request = self.anon_request(
            self.client
                .post(format!("{}/recover", self.auth_url))
                .json(&serde_json::json!({ "email": email })),
        );
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }

    /// Set a new password for the signed-in account.
    pub async fn update_password(&self, access_token: &str, new_password: &str) -> AuthResult<()> {
        if new_password.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("password is required"));
        }

        let response = self
            .client
            .put(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }

    fn anon_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_session_request(&self, request: RequestBuilder) -> AuthResult<SessionPayload> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<SessionPayload>().await?)
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::InvalidCredentials("email is required"));
    }
    if password.trim().is_empty() {
        return Err(AuthError::InvalidCredentials("password is required"));
    }
    Ok(())
}

/// Raw session response shape.
///
/// `/token` answers with the session fields at the top level; `/signup` may
/// nest them under `session` (or omit them entirely when email confirmation
/// is pending).
#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<RawUser>,
    session: Option<Box<SessionPayload>>,
}

impl SessionPayload {
    fn resolve(self) -> AuthResult<Option<AuthSession>> {
        if let Some(nested) = self.session {
            return nested.resolve();
        }

        let user = self.user.map(AuthUser::from);
        let (Some(access_token), Some(refresh_token)) = (self.access_token, self.refresh_token)
        else {
            // A bare user with no tokens means confirmation is pending.
            return if user.is_some() {
                Ok(None)
            } else {
                Err(AuthError::Api(
                    "Auth response did not include session fields".to_string(),
                ))
            };
        };

        let expires_at = self
            .expires_at
            .or_else(|| {
                self.expires_in
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            })
            .ok_or_else(|| {
                AuthError::Api("Auth response did not include an expiry".to_string())
            })?;
        let user = user.ok_or_else(|| {
            AuthError::Api("Auth response did not include the user".to_string())
        })?;

        Ok(Some(AuthSession {
            access_token,
            refresh_token,
            expires_at,
            user,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
}

impl From<RawUser> for AuthUser {
    fn from(value: RawUser) -> Self {
        let username = value
            .user_metadata
            .as_ref()
            .and_then(|metadata| metadata.get("username"))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);
        Self {
            id: value.id,
            email: value.email,
            username,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AuthErrorBody>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_resolves_flat_session() {
        let raw = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "user": {
                "id": "u1",
                "email": "ani@example.com",
                "user_metadata": { "username": "ani" }
            }
        }"#;
        let payload: SessionPayload = serde_json::from_str(raw).unwrap();
        let session = payload.resolve().unwrap().unwrap();
        assert_eq!(session.access_token, "at");
        assert_eq!(session.user.username.as_deref(), Some("ani"));
        assert!(session.expires_at > unix_timestamp_now());
    }

    #[test]
    fn signup_response_resolves_nested_session() {
        let raw = r#"{
            "user": { "id": "u1", "email": "ani@example.com" },
            "session": {
                "access_token": "at",
                "refresh_token": "rt",
                "expires_at": 1900000000,
                "user": { "id": "u1", "email": "ani@example.com" }
            }
        }"#;
        let payload: SessionPayload = serde_json::from_str(raw).unwrap();
        let session = payload.resolve().unwrap().unwrap();
        assert_eq!(session.expires_at, 1_900_000_000);
    }

    #[test]
    fn user_without_tokens_means_confirmation_required() {
        let raw = r#"{ "user": { "id": "u1", "email": "ani@example.com" } }"#;
        let payload: SessionPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.resolve().unwrap().is_none());
    }

    #[test]
    fn empty_response_is_an_error() {
        let payload: SessionPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.resolve().is_err());
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
                username: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let rendered = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"msg": "Invalid login credentials"}"#,
        );
        assert_eq!(rendered, "Invalid login credentials (400)");
    }
}

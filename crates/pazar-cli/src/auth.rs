//! CLI auth/session helpers with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use pazar_core::auth::{
    AuthResult, SessionPersistence, SignUpOutcome, SupabaseAuthClient,
};
use pazar_core::BackendConfig;
pub use pazar_core::auth::{AuthError, AuthSession};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "pazar-cli";

#[derive(Clone)]
struct SessionStore {
    username: String,
}

impl SessionStore {
    fn new(profile_name: &str) -> Self {
        Self {
            username: format!("session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let store = Self::test_store();
        let guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        if let Some(raw) = guard.get(&self.username) {
            Ok(Some(serde_json::from_str(raw)?))
        } else {
            Ok(None)
        }
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(())
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let store = Self::test_store();
        let mut guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let store = Self::test_store();
        let mut guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Profile-scoped auth client with keychain session persistence.
#[derive(Clone)]
pub struct PazarAuthService {
    inner: SupabaseAuthClient<SessionStore>,
}

impl PazarAuthService {
    pub fn new(profile_name: &str, config: &BackendConfig) -> AuthResult<Self> {
        Ok(Self {
            inner: SupabaseAuthClient::new(config, SessionStore::new(profile_name))?,
        })
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<SignUpOutcome> {
        self.inner.sign_up(username, email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.inner.sign_out(access_token).await
    }

    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        self.inner.reset_password(email).await
    }

    pub async fn update_password(&self, access_token: &str, new_password: &str) -> AuthResult<()> {
        self.inner.update_password(access_token, new_password).await
    }
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use pazar_core::auth::AuthUser;

    use super::*;

    fn test_session() -> AuthSession {
        AuthSession {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: 1_900_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("ani@example.com".to_string()),
                username: Some("ani".to_string()),
            },
        }
    }

    #[test]
    fn session_store_roundtrips_per_profile() {
        let store = SessionStore::new("roundtrip-test");
        store.save_session(&test_session()).unwrap();

        let loaded = store.load_session().unwrap().unwrap();
        assert_eq!(loaded.user.username.as_deref(), Some("ani"));

        // Other profiles see their own slot only.
        let other = SessionStore::new("another-profile");
        assert!(other.load_session().unwrap().is_none());

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }
}

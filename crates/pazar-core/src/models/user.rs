//! User identity and profile models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-issued user identifier (opaque subject id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Public profile row backing the profile screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub username: String,
    /// Storage object path of the avatar image, when one was uploaded
    #[serde(default)]
    pub avatar_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_displays_raw_value() {
        let id = UserId::from("d314fbce-d056-46e4-a55d-82f19d2ca940");
        assert_eq!(id.to_string(), "d314fbce-d056-46e4-a55d-82f19d2ca940");
    }

    #[test]
    fn profile_tolerates_missing_avatar() {
        let raw = r#"{"id": "u1", "email": "a@b.bg", "username": "ani"}"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.username, "ani");
        assert!(profile.avatar_path.is_none());
    }
}

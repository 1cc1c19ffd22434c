//! Backend endpoint configuration for client apps.
//!
//! All persistence, auth, and file storage are delegated to a managed
//! Supabase project; this module holds the public endpoints/keys needed to
//! reach it. Secret credentials must never be stored here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Default storage bucket holding listing thumbnails and avatars.
pub const DEFAULT_BUCKET: &str = "listings_bucket";

/// Validated backend configuration shared by every client in the crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
    anon_key: String,
    bucket: String,
}

impl BackendConfig {
    /// Build a configuration from a project base URL and anon key.
    ///
    /// The base URL must carry an `http://` or `https://` scheme; trailing
    /// slashes are stripped. The anon key must be non-empty.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        Self::with_bucket(base_url, anon_key, DEFAULT_BUCKET)
    }

    /// Build a configuration with an explicit storage bucket.
    pub fn with_bucket(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self> {
        let base_url = normalize_text_option(Some(base_url.into()))
            .ok_or_else(|| Error::InvalidInput("backend URL must not be empty".to_string()))?;
        if !is_http_url(&base_url) {
            return Err(Error::InvalidInput(
                "backend URL must include http:// or https://".to_string(),
            ));
        }

        let anon_key = normalize_text_option(Some(anon_key.into()))
            .ok_or_else(|| Error::InvalidInput("anon key must not be empty".to_string()))?;

        let bucket = normalize_text_option(Some(bucket.into()))
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            bucket,
        })
    }

    /// Project base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public anon key sent with every request.
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Storage bucket name for uploaded images.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// GoTrue auth endpoint root.
    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url)
    }

    /// PostgREST data endpoint root.
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url)
    }

    /// Storage endpoint root.
    #[must_use]
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_service_endpoints() {
        let config = BackendConfig::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(config.base_url(), "https://demo.supabase.co");
        assert_eq!(config.auth_url(), "https://demo.supabase.co/auth/v1");
        assert_eq!(config.rest_url(), "https://demo.supabase.co/rest/v1");
        assert_eq!(config.storage_url(), "https://demo.supabase.co/storage/v1");
        assert_eq!(config.bucket(), DEFAULT_BUCKET);
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(BackendConfig::new("demo.supabase.co", "anon").is_err());
    }

    #[test]
    fn rejects_empty_anon_key() {
        assert!(BackendConfig::new("https://demo.supabase.co", "   ").is_err());
    }

    #[test]
    fn empty_bucket_falls_back_to_default() {
        let config = BackendConfig::with_bucket("https://demo.supabase.co", "anon", " ").unwrap();
        assert_eq!(config.bucket(), DEFAULT_BUCKET);
    }
}

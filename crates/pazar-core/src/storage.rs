//! Supabase Storage client for listing thumbnails and avatars.
//!
//! Objects live in one bucket with a deterministic key layout:
//! `listings/<user_id>/<listing_id>/<file_name>` for thumbnails and
//! `avatars/<user_id>/<file_name>` for profile images. Keys, not full URLs,
//! are what the data rows store; `public_url` turns a key into a servable
//! address.

use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::models::{ListingId, UserId};
use crate::util::{compact_text, sanitize_file_name};

const LISTINGS_PREFIX: &str = "listings";
const AVATARS_PREFIX: &str = "avatars";
const FOLDER_LIST_LIMIT: usize = 100;

/// HTTP client for bucket object operations.
#[derive(Clone)]
pub struct StorageClient {
    storage_url: String,
    bucket: String,
    anon_key: String,
    client: reqwest::Client,
}

impl StorageClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            storage_url: config.storage_url(),
            bucket: config.bucket().to_string(),
            anon_key: config.anon_key().to_string(),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Upload a listing thumbnail; returns the stored object path.
    pub async fn upload_listing_thumbnail(
        &self,
        access_token: &str,
        user_id: &UserId,
        listing_id: &ListingId,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let path = listing_thumbnail_key(user_id, listing_id, file_name);
        self.upload_object(access_token, &path, content_type, bytes)
            .await?;
        Ok(path)
    }

    /// Upload a profile avatar; returns the stored object path.
    pub async fn upload_avatar(
        &self,
        access_token: &str,
        user_id: &UserId,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let path = avatar_key(user_id, file_name);
        self.upload_object(access_token, &path, content_type, bytes)
            .await?;
        Ok(path)
    }

    /// Delete one object; an already-absent object is not an error.
    pub async fn remove_object(&self, access_token: &str, path: &str) -> Result<()> {
        let response = self
            .authed(access_token, Method::DELETE, &self.object_url(path))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            Ok(())
        } else {
            Err(storage_api_error(response).await)
        }
    }

    /// Delete every object under a listing's folder.
    ///
    /// Storage has no recursive delete, so this lists the prefix and
    /// batch-removes what it finds.
    pub async fn delete_listing_folder(
        &self,
        access_token: &str,
        user_id: &UserId,
        listing_id: &ListingId,
    ) -> Result<()> {
        let prefix = format!("{LISTINGS_PREFIX}/{user_id}/{listing_id}");
        let names = self.list_folder(access_token, &prefix).await?;
        if names.is_empty() {
            return Ok(());
        }

        let prefixes: Vec<String> = names
            .into_iter()
            .map(|name| format!("{prefix}/{name}"))
            .collect();
        let response = self
            .authed(
                access_token,
                Method::DELETE,
                &format!("{}/object/{}", self.storage_url, self.bucket),
            )
            .json(&serde_json::json!({ "prefixes": prefixes }))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(storage_api_error(response).await)
        }
    }

    /// Public URL serving an object path.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            self.bucket,
            encode_object_path(path)
        )
    }

    async fn upload_object(
        &self,
        access_token: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let response = self
            .authed(access_token, Method::POST, &self.object_url(path))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(storage_api_error(response).await)
        }
    }

    async fn list_folder(&self, access_token: &str, prefix: &str) -> Result<Vec<String>> {
        let response = self
            .authed(
                access_token,
                Method::POST,
                &format!("{}/object/list/{}", self.storage_url, self.bucket),
            )
            .json(&serde_json::json!({
                "prefix": prefix,
                "limit": FOLDER_LIST_LIMIT,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(storage_api_error(response).await);
        }

        let entries = response.json::<Vec<ObjectEntry>>().await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    fn authed(&self, access_token: &str, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            self.bucket,
            encode_object_path(path)
        )
    }
}

async fn storage_api_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StorageErrorBody>(&body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .unwrap_or_else(|| compact_text(&body));
    if message.is_empty() {
        Error::Api(format!("HTTP {}", status.as_u16()))
    } else {
        Error::Api(format!("{} ({})", message.trim(), status.as_u16()))
    }
}

/// Object key for a listing's thumbnail image.
#[must_use]
pub fn listing_thumbnail_key(user_id: &UserId, listing_id: &ListingId, file_name: &str) -> String {
    format!(
        "{LISTINGS_PREFIX}/{user_id}/{listing_id}/{}",
        sanitize_file_name(file_name)
    )
}

/// Object key for a user's avatar image.
#[must_use]
pub fn avatar_key(user_id: &UserId, file_name: &str) -> String {
    format!("{AVATARS_PREFIX}/{user_id}/{}", sanitize_file_name(file_name))
}

/// Percent-encode each path segment while keeping `/` separators.
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StorageErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_client() -> StorageClient {
        let config =
            crate::config::BackendConfig::new("https://demo.supabase.co", "anon").unwrap();
        StorageClient::new(&config).unwrap()
    }

    #[test]
    fn thumbnail_key_uses_listing_folder_layout() {
        let user = UserId::from("d314fbce-d056-46e4-a55d-82f19d2ca940");
        let listing: ListingId = "c4655a5c-d611-4b5d-b924-d9e90e77902a".parse().unwrap();
        let key = listing_thumbnail_key(&user, &listing, "IMG_0005.jpg");
        assert_eq!(
            key,
            "listings/d314fbce-d056-46e4-a55d-82f19d2ca940/c4655a5c-d611-4b5d-b924-d9e90e77902a/IMG_0005.jpg"
        );
    }

    #[test]
    fn avatar_key_sanitizes_file_name() {
        let user = UserId::from("u1");
        assert_eq!(avatar_key(&user, "../me.png"), "avatars/u1/.._me.png");
    }

    #[test]
    fn public_url_joins_bucket_and_path() {
        let client = test_client();
        assert_eq!(
            client.public_url("listings/u1/l1/IMG 1.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/listings_bucket/listings/u1/l1/IMG%201.jpg"
        );
    }
}

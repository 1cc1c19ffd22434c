//! Shared context assembly and output helpers for subcommands.

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use pazar_core::auth::AuthSession;
use pazar_core::favorites::{JsonFileStore, LocalFavoritesStore};
use pazar_core::models::{Listing, ListingId, UserId};
use pazar_core::storage::StorageClient;
use pazar_core::util::normalize_text_option;
use pazar_core::BackendConfig;

use crate::auth::PazarAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
const ENV_STORAGE_BUCKET: &str = "PAZAR_STORAGE_BUCKET";

/// Resolved per-invocation context: the effective profile and its backend.
pub struct AppContext {
    pub profile_name: String,
    pub config: BackendConfig,
}

impl AppContext {
    /// Resolve the profile (flag, env, active) and build its backend config.
    ///
    /// Environment variables fill in anything the stored profile omits, so
    /// a bare `SUPABASE_URL`/`SUPABASE_ANON_KEY` pair works without any
    /// `pazar config init`.
    pub fn load(global_profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(global_profile);
        let profile = profiles.profile(&profile_name).cloned().unwrap_or_default();

        let supabase_url = profile
            .supabase_url()
            .or_else(|| normalize_text_option(env::var(ENV_SUPABASE_URL).ok()))
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Profile '{profile_name}' has no backend URL. Run `pazar config init --profile {profile_name}` or set {ENV_SUPABASE_URL}."
                ))
            })?;
        let anon_key = profile
            .supabase_anon_key()
            .or_else(|| normalize_text_option(env::var(ENV_SUPABASE_ANON_KEY).ok()))
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Profile '{profile_name}' has no anon key. Run `pazar config init --profile {profile_name}` or set {ENV_SUPABASE_ANON_KEY}."
                ))
            })?;
        let bucket = profile
            .storage_bucket()
            .or_else(|| normalize_text_option(env::var(ENV_STORAGE_BUCKET).ok()));

        let config = match bucket {
            Some(bucket) => BackendConfig::with_bucket(supabase_url, anon_key, bucket),
            None => BackendConfig::new(supabase_url, anon_key),
        }
        .map_err(|error| CliError::Config(error.to_string()))?;

        Ok(Self {
            profile_name,
            config,
        })
    }

    pub fn auth_service(&self) -> Result<PazarAuthService, CliError> {
        Ok(PazarAuthService::new(&self.profile_name, &self.config)?)
    }

    /// The stored session, refreshed when necessary.
    pub async fn require_session(&self) -> Result<AuthSession, CliError> {
        self.auth_service()?
            .restore_session()
            .await?
            .ok_or(CliError::NotSignedIn)
    }

    /// Device-local favorites store scoped to this profile.
    pub fn favorites_store(&self) -> LocalFavoritesStore<JsonFileStore> {
        LocalFavoritesStore::new(JsonFileStore::new(self.data_dir()))
    }

    fn data_dir(&self) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(env::temp_dir)
            .join("pazar")
            .join(&self.profile_name)
    }
}

pub fn session_user_id(session: &AuthSession) -> UserId {
    UserId::from(session.user.id.as_str())
}

pub fn parse_listing_id(raw: &str) -> Result<ListingId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidListingId(raw.trim().to_string()))
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::EmptySearchQuery);
    }
    Ok(query.to_string())
}

/// Read an image file for upload, returning its name, MIME type, and bytes.
pub fn read_image_file(path: &Path) -> Result<(String, String, Vec<u8>), CliError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.jpg")
        .to_string();
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok((file_name, content_type, bytes))
}

#[derive(Debug, Serialize)]
pub struct ListingItem {
    pub listing_id: String,
    pub title: String,
    pub phone_number: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub creator_id: String,
    pub created_at: String,
}

pub fn listing_to_item(listing: &Listing, storage: &StorageClient) -> ListingItem {
    ListingItem {
        listing_id: listing.listing_id.to_string(),
        title: listing.title.clone(),
        phone_number: listing.phone_number.clone(),
        description: listing.description.clone(),
        thumbnail_url: listing
            .thumbnail_path
            .as_deref()
            .map(|path| storage.public_url(path)),
        creator_id: listing.creator_id.to_string(),
        created_at: format_timestamp(listing.created_at),
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_listing_lines(listings: &[Listing]) -> Vec<String> {
    listings
        .iter()
        .map(|listing| {
            format!(
                "{}  {}  {}  {}",
                listing.listing_id,
                format_timestamp(listing.created_at),
                listing.phone_number,
                title_preview(&listing.title, 48)
            )
        })
        .collect()
}

/// First line of the title, truncated with an ellipsis.
pub fn title_preview(title: &str, max_len: usize) -> String {
    let first_line = title.lines().next().unwrap_or("");
    if first_line.chars().count() <= max_len {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
    format!("{truncated}...")
}

/// Print a listing collection as text lines or a JSON array.
pub fn print_listings(
    listings: &[Listing],
    as_json: bool,
    storage: &StorageClient,
) -> Result<(), CliError> {
    if as_json {
        let items: Vec<ListingItem> = listings
            .iter()
            .map(|listing| listing_to_item(listing, storage))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if listings.is_empty() {
        println!("No listings found");
    } else {
        for line in format_listing_lines(listings) {
            println!("{line}");
        }
    }
    Ok(())
}

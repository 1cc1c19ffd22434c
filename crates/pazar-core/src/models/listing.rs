//! Listing model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::UserId;

/// A unique identifier for a listing (UUID v4, client-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(Uuid);

impl ListingId {
    /// Create a new random listing ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ListingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A classified-ad record owned by its creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable identifier
    pub listing_id: ListingId,
    /// Short title shown in listing feeds
    pub title: String,
    /// Contact phone number
    pub phone_number: String,
    /// Optional long-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Storage object path of the thumbnail image, when one was uploaded
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    /// Owning user
    pub creator_id: UserId,
    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Client-side shape for creating a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewListing {
    pub listing_id: ListingId,
    pub title: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    pub creator_id: UserId,
}

impl NewListing {
    /// Build a new listing draft with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        phone_number: impl Into<String>,
        creator_id: UserId,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("listing title is required".to_string()));
        }
        let phone_number = phone_number.into().trim().to_string();
        if phone_number.is_empty() {
            return Err(Error::InvalidInput(
                "listing phone number is required".to_string(),
            ));
        }

        Ok(Self {
            listing_id: ListingId::new(),
            title,
            phone_number,
            description: None,
            thumbnail_path: None,
            creator_id,
        })
    }
}

/// Partial update applied to an existing listing.
///
/// Only set fields are sent; thumbnail removal is a separate operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
}

impl ListingPatch {
    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.phone_number.is_none()
            && self.description.is_none()
            && self.thumbnail_path.is_none()
    }
}

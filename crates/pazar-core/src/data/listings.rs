//! Listings table client

use reqwest::Method;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::data::{expect_success, into_api_error, RestClient};
use crate::error::{Error, Result};
use crate::models::{Listing, ListingId, ListingPatch, NewListing, UserId};

/// Capability seam over the listings table.
///
/// `exists` is the one operation the favorites reconciler depends on: a
/// deleted or never-created listing answers `false`, never an error; only
/// connectivity faults fail.
#[allow(async_fn_in_trait)]
pub trait ListingsRepository {
    /// Whether the listing id still denotes a live record.
    async fn exists(&self, listing_id: &ListingId) -> Result<bool>;
}

/// PostgREST-backed client for the `listings` table.
#[derive(Clone)]
pub struct ListingsClient {
    rest: RestClient,
}

impl ListingsClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    /// Clone of this client authorized as the given signed-in user.
    ///
    /// Required for create/update/delete, which row-level security scopes
    /// to the listing's creator.
    #[must_use]
    pub fn with_access_token(&self, access_token: &str) -> Self {
        Self {
            rest: self.rest.with_access_token(access_token),
        }
    }

    /// Newest listings first, up to `limit`.
    pub async fn latest(&self, limit: usize) -> Result<Vec<Listing>> {
        self.fetch_rows(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    /// Case-insensitive title substring search, newest first.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("search query is required".to_string()));
        }

        self.fetch_rows(&[
            ("select", "*".to_string()),
            ("title", format!("ilike.*{query}*")),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    /// All listings owned by a user, newest first.
    pub async fn by_creator(&self, creator_id: &UserId) -> Result<Vec<Listing>> {
        self.fetch_rows(&[
            ("select", "*".to_string()),
            ("creator_id", format!("eq.{creator_id}")),
            ("order", "created_at.desc".to_string()),
        ])
        .await
    }

    /// Fetch one listing; `None` when it does not (or no longer does) exist.
    pub async fn get(&self, listing_id: &ListingId) -> Result<Option<Listing>> {
        let rows = self
            .fetch_rows(&[
                ("select", "*".to_string()),
                ("listing_id", format!("eq.{listing_id}")),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a listing row and return the stored record.
    pub async fn create(&self, draft: &NewListing) -> Result<Listing> {
        let response = self
            .rest
            .request(Method::POST, "listings")
            .header("Prefer", "return=representation")
            .json(draft)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }

        let mut rows = response.json::<Vec<Listing>>().await?;
        rows.pop()
            .ok_or_else(|| Error::Api("insert returned no row".to_string()))
    }

    /// Apply a partial update to an owned listing.
    pub async fn update(&self, listing_id: &ListingId, patch: &ListingPatch) -> Result<Listing> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }

        let response = self
            .rest
            .request(Method::PATCH, "listings")
            .query(&[("listing_id", format!("eq.{listing_id}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }

        let mut rows = response.json::<Vec<Listing>>().await?;
        rows.pop()
            .ok_or_else(|| Error::NotFound(listing_id.to_string()))
    }

    /// Clear the thumbnail column after its object was removed from storage.
    pub async fn clear_thumbnail(&self, listing_id: &ListingId) -> Result<()> {
        let response = self
            .rest
            .request(Method::PATCH, "listings")
            .query(&[("listing_id", format!("eq.{listing_id}"))])
            .json(&serde_json::json!({ "thumbnail_path": null }))
            .send()
            .await?;
        expect_success(response).await
    }

    /// Delete an owned listing row.
    pub async fn delete(&self, listing_id: &ListingId) -> Result<()> {
        let response = self
            .rest
            .request(Method::DELETE, "listings")
            .query(&[("listing_id", format!("eq.{listing_id}"))])
            .send()
            .await?;
        expect_success(response).await
    }

    async fn fetch_rows(&self, params: &[(&str, String)]) -> Result<Vec<Listing>> {
        let response = self
            .rest
            .request(Method::GET, "listings")
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }
        Ok(response.json::<Vec<Listing>>().await?)
    }
}

impl ListingsRepository for ListingsClient {
    async fn exists(&self, listing_id: &ListingId) -> Result<bool> {
        let response = self
            .rest
            .request(Method::GET, "listings")
            .query(&[
                ("select", "listing_id".to_string()),
                ("listing_id", format!("eq.{listing_id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }

        let rows = response.json::<Vec<ListingKeyRow>>().await?;
        Ok(!rows.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ListingKeyRow {
    #[allow(dead_code)]
    listing_id: ListingId,
}

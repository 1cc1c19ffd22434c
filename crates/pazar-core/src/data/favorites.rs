//! Favorites table client

use reqwest::Method;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::data::{expect_success, into_api_error, RestClient};
use crate::error::Result;
use crate::models::{FavoriteRef, ListingId, UserId};

/// Capability seam over the server-side favorites table.
///
/// The table is the authoritative per-user favorite set; rows are added and
/// removed individually, and `(user_id, listing_id)` uniqueness is enforced
/// by the backend. Callers must avoid inserting a pair that is already
/// present; a violation surfaces as [`crate::Error::Constraint`].
#[allow(async_fn_in_trait)]
pub trait FavoritesRepository {
    /// The user's favorite refs; empty, not an error, when none exist.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<FavoriteRef>>;

    /// Insert one `(user, listing)` pair.
    async fn add(&self, user_id: &UserId, listing_id: &ListingId) -> Result<()>;

    /// Delete the pair if present; succeeds as a no-op when absent.
    async fn remove(&self, user_id: &UserId, listing_id: &ListingId) -> Result<()>;
}

/// PostgREST-backed client for the `favorites` table.
#[derive(Clone)]
pub struct FavoritesClient {
    rest: RestClient,
}

impl FavoritesClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    /// Clone of this client authorized as the given signed-in user.
    ///
    /// Row-level security scopes every favorites operation to the token's
    /// subject, so reads and writes both want the bound token.
    #[must_use]
    pub fn with_access_token(&self, access_token: &str) -> Self {
        Self {
            rest: self.rest.with_access_token(access_token),
        }
    }
}

impl FavoritesRepository for FavoritesClient {
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<FavoriteRef>> {
        let response = self
            .rest
            .request(Method::GET, "favorites")
            .query(&[
                ("select", "listing_id".to_string()),
                ("user_id", format!("eq.{user_id}")),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(into_api_error(response).await);
        }

        let rows = response.json::<Vec<FavoriteRow>>().await?;
        Ok(rows
            .into_iter()
            .map(|row| FavoriteRef::new(row.listing_id))
            .collect())
    }

    async fn add(&self, user_id: &UserId, listing_id: &ListingId) -> Result<()> {
        let response = self
            .rest
            .request(Method::POST, "favorites")
            .json(&serde_json::json!({
                "user_id": user_id,
                "listing_id": listing_id,
            }))
            .send()
            .await?;
        expect_success(response).await
    }

    async fn remove(&self, user_id: &UserId, listing_id: &ListingId) -> Result<()> {
        let response = self
            .rest
            .request(Method::DELETE, "favorites")
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("listing_id", format!("eq.{listing_id}")),
            ])
            .send()
            .await?;
        expect_success(response).await
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    listing_id: ListingId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_rows_parse_select_projection() {
        let raw = r#"[
            {"listing_id": "c4655a5c-d611-4b5d-b924-d9e90e77902a"},
            {"listing_id": "d314fbce-d056-46e4-a55d-82f19d2ca940"}
        ]"#;
        let rows: Vec<FavoriteRow> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows.len(), 2);
    }
}

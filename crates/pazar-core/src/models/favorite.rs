//! Favorite bookmark model

use serde::{Deserialize, Serialize};

use crate::models::listing::ListingId;

/// A bookmark pointing at a listing by its stable identifier.
///
/// The same shape is persisted device-locally (pre-login) and server-side
/// (per user); ordering carries no meaning, uniqueness is per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteRef {
    pub listing_id: ListingId,
}

impl FavoriteRef {
    #[must_use]
    pub const fn new(listing_id: ListingId) -> Self {
        Self { listing_id }
    }
}

impl From<ListingId> for FavoriteRef {
    fn from(listing_id: ListingId) -> Self {
        Self { listing_id }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn refs_deduplicate_by_listing_id() {
        let id = ListingId::new();
        let mut set = HashSet::new();
        set.insert(FavoriteRef::new(id));
        set.insert(FavoriteRef::new(id));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serializes_as_listing_id_object() {
        let id: ListingId = "c4655a5c-d611-4b5d-b924-d9e90e77902a".parse().unwrap();
        let raw = serde_json::to_string(&FavoriteRef::new(id)).unwrap();
        assert_eq!(
            raw,
            r#"{"listing_id":"c4655a5c-d611-4b5d-b924-d9e90e77902a"}"#
        );
    }
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pazar_core::Error),
    #[error(transparent)]
    Auth(#[from] pazar_core::auth::AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `pazar auth sign-in` first.")]
    NotSignedIn,
    #[error("Invalid listing ID: {0}")]
    InvalidListingId(String),
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Listing not found: {0}")]
    ListingNotFound(String),
    #[error("Nothing to update; pass at least one field")]
    EmptyPatch,
    #[error("Only the listing's creator can modify it")]
    NotOwner,
}

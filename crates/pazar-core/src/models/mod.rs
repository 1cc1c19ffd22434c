//! Domain models shared across clients.

pub mod favorite;
pub mod listing;
pub mod user;

pub use favorite::FavoriteRef;
pub use listing::{Listing, ListingId, ListingPatch, NewListing};
pub use user::{UserId, UserProfile};

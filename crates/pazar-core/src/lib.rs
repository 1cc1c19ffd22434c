//! pazar-core - Core library for Pazar
//!
//! This crate contains the shared models, backend clients (auth, data,
//! storage), the device-local favorites cache, and the sign-in favorites
//! reconciliation used by all Pazar surfaces.

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod favorites;
pub mod models;
pub mod session;
pub mod storage;
pub mod util;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use models::{FavoriteRef, Listing, ListingId, UserId, UserProfile};
pub use session::AppSession;

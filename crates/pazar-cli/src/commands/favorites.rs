//! Favorites subcommands.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use pazar_core::data::{FavoritesClient, FavoritesRepository, ListingsClient};
use pazar_core::models::FavoriteRef;
use pazar_core::session::{FavoritesService, SessionUser};
use pazar_core::AppSession;

use crate::cli::FavoriteCommands;
use crate::commands::common::{
    parse_listing_id, session_user_id, title_preview, AppContext,
};
use crate::error::CliError;

pub async fn run_favorites(
    command: FavoriteCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::load(global_profile)?;

    match command {
        FavoriteCommands::List { json } => run_list(&context, json).await,
        FavoriteCommands::Toggle { id } => run_toggle(&context, &id).await,
    }
}

#[derive(Debug, Serialize)]
struct FavoriteItem {
    listing_id: String,
    title: Option<String>,
}

/// Show the favorite set backing the favorites view: the account's table
/// when signed in, the device cache otherwise.
async fn run_list(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let stored = context.auth_service()?.restore_session().await?;
    let refs: HashSet<FavoriteRef> = match &stored {
        Some(session) => {
            let client = FavoritesClient::new(&context.config)?
                .with_access_token(&session.access_token);
            client
                .list_by_user(&session_user_id(session))
                .await?
                .into_iter()
                .collect()
        }
        None => context.favorites_store().read_all().await,
    };

    let listings = ListingsClient::new(&context.config)?;
    let mut items = Vec::with_capacity(refs.len());
    for favorite in &refs {
        // Favorites pointing at since-deleted listings render without a title.
        let title = listings
            .get(&favorite.listing_id)
            .await?
            .map(|listing| listing.title);
        items.push(FavoriteItem {
            listing_id: favorite.listing_id.to_string(),
            title,
        });
    }
    items.sort_by(|a, b| a.listing_id.cmp(&b.listing_id));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No favorites yet");
    } else {
        for item in items {
            match item.title {
                Some(title) => println!("{}  {}", item.listing_id, title_preview(&title, 48)),
                None => println!("{}  (listing no longer exists)", item.listing_id),
            }
        }
    }
    Ok(())
}

/// Flip one listing's favorite state through the write-through service.
async fn run_toggle(context: &AppContext, raw_id: &str) -> Result<(), CliError> {
    let listing_id = parse_listing_id(raw_id)?;
    let stored = context.auth_service()?.restore_session().await?;
    let local = Arc::new(context.favorites_store());
    let app_session = AppSession::new();

    let remote = match &stored {
        Some(session) => {
            // Seed the session set so the toggle flips against current state.
            let client = FavoritesClient::new(&context.config)?
                .with_access_token(&session.access_token);
            let current = client.list_by_user(&session_user_id(session)).await?;
            app_session
                .sign_in(SessionUser::from(&session.user), None)
                .await;
            app_session
                .publish_favorites(current.into_iter().collect())
                .await;
            client
        }
        None => FavoritesClient::new(&context.config)?,
    };

    let service = FavoritesService::new(remote, local, app_session);
    let now_favorite = service.toggle(listing_id).await?;
    if now_favorite {
        println!("Added {listing_id} to favorites");
    } else {
        println!("Removed {listing_id} from favorites");
    }
    Ok(())
}

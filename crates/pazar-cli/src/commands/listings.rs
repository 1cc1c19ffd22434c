//! Listing browse/post/edit subcommands.

use pazar_core::data::ListingsClient;
use pazar_core::models::{ListingPatch, NewListing};
use pazar_core::storage::StorageClient;

use crate::cli::ListingCommands;
use crate::commands::common::{
    listing_to_item, normalize_search_query, parse_listing_id, print_listings, read_image_file,
    session_user_id, AppContext,
};
use crate::error::CliError;

pub async fn run_listings(
    command: ListingCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::load(global_profile)?;
    let listings = ListingsClient::new(&context.config)?;
    let storage = StorageClient::new(&context.config)?;

    match command {
        ListingCommands::Latest { limit, json } => {
            let rows = listings.latest(limit).await?;
            print_listings(&rows, json, &storage)
        }
        ListingCommands::Search { query, limit, json } => {
            let query = normalize_search_query(&query)?;
            let rows = listings.search(&query, limit).await?;
            print_listings(&rows, json, &storage)
        }
        ListingCommands::Mine { json } => {
            let session = context.require_session().await?;
            let rows = listings.by_creator(&session_user_id(&session)).await?;
            print_listings(&rows, json, &storage)
        }
        ListingCommands::Show { id } => {
            let listing_id = parse_listing_id(&id)?;
            let listing = listings
                .get(&listing_id)
                .await?
                .ok_or(CliError::ListingNotFound(id))?;
            let item = listing_to_item(&listing, &storage);
            println!("{}", serde_json::to_string_pretty(&item)?);
            Ok(())
        }
        ListingCommands::Create {
            title,
            phone,
            description,
            image,
        } => {
            let session = context.require_session().await?;
            let user_id = session_user_id(&session);
            let mut draft = NewListing::new(title, phone, user_id.clone())?;
            draft.description = description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());

            if let Some(path) = image {
                let (file_name, content_type, bytes) = read_image_file(&path)?;
                let object_path = storage
                    .upload_listing_thumbnail(
                        &session.access_token,
                        &user_id,
                        &draft.listing_id,
                        &file_name,
                        &content_type,
                        bytes,
                    )
                    .await?;
                draft.thumbnail_path = Some(object_path);
            }

            let created = listings
                .with_access_token(&session.access_token)
                .create(&draft)
                .await?;
            println!("{}", created.listing_id);
            Ok(())
        }
        ListingCommands::Edit {
            id,
            title,
            phone,
            description,
            image,
            remove_image,
        } => {
            let session = context.require_session().await?;
            let user_id = session_user_id(&session);
            let listing_id = parse_listing_id(&id)?;
            let existing = listings
                .get(&listing_id)
                .await?
                .ok_or(CliError::ListingNotFound(id))?;
            if existing.creator_id != user_id {
                return Err(CliError::NotOwner);
            }

            let owned = listings.with_access_token(&session.access_token);

            if remove_image {
                if let Some(path) = existing.thumbnail_path.as_deref() {
                    storage.remove_object(&session.access_token, path).await?;
                }
                owned.clear_thumbnail(&listing_id).await?;
            }

            let mut patch = ListingPatch {
                title,
                phone_number: phone,
                description,
                thumbnail_path: None,
            };

            if let Some(path) = image {
                // Replace: drop the old object before uploading the new one.
                if let Some(old_path) = existing.thumbnail_path.as_deref() {
                    storage
                        .remove_object(&session.access_token, old_path)
                        .await?;
                }
                let (file_name, content_type, bytes) = read_image_file(&path)?;
                let object_path = storage
                    .upload_listing_thumbnail(
                        &session.access_token,
                        &user_id,
                        &listing_id,
                        &file_name,
                        &content_type,
                        bytes,
                    )
                    .await?;
                patch.thumbnail_path = Some(object_path);
            }

            if patch.is_empty() {
                if remove_image {
                    println!("{listing_id}");
                    return Ok(());
                }
                return Err(CliError::EmptyPatch);
            }

            let updated = owned.update(&listing_id, &patch).await?;
            println!("{}", updated.listing_id);
            Ok(())
        }
        ListingCommands::Delete { id } => {
            let session = context.require_session().await?;
            let user_id = session_user_id(&session);
            let listing_id = parse_listing_id(&id)?;

            listings
                .with_access_token(&session.access_token)
                .delete(&listing_id)
                .await?;
            storage
                .delete_listing_folder(&session.access_token, &user_id, &listing_id)
                .await?;
            println!("{listing_id}");
            Ok(())
        }
    }
}

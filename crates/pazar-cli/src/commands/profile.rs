//! Profile and avatar subcommands.

use serde::Serialize;

use pazar_core::data::ProfilesClient;
use pazar_core::storage::StorageClient;

use crate::cli::{AvatarCommands, ProfileCommands};
use crate::commands::common::{read_image_file, session_user_id, AppContext};
use crate::error::CliError;

pub async fn run_profile(
    command: ProfileCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::load(global_profile)?;
    let session = context.require_session().await?;
    let user_id = session_user_id(&session);
    let profiles = ProfilesClient::new(&context.config)?.with_access_token(&session.access_token);
    let storage = StorageClient::new(&context.config)?;

    match command {
        ProfileCommands::Show => {
            let Some(profile) = profiles.get(&user_id).await? else {
                println!("No profile row for {user_id} yet");
                return Ok(());
            };
            let item = ProfileItem {
                id: profile.id.to_string(),
                email: profile.email,
                username: profile.username,
                avatar_url: profile
                    .avatar_path
                    .as_deref()
                    .map(|path| storage.public_url(path)),
            };
            println!("{}", serde_json::to_string_pretty(&item)?);
            Ok(())
        }
        ProfileCommands::Avatar(AvatarCommands::Set { path }) => {
            let previous = profiles
                .get(&user_id)
                .await?
                .and_then(|profile| profile.avatar_path);

            let (file_name, content_type, bytes) = read_image_file(&path)?;
            let object_path = storage
                .upload_avatar(
                    &session.access_token,
                    &user_id,
                    &file_name,
                    &content_type,
                    bytes,
                )
                .await?;
            profiles
                .set_avatar_path(&user_id, Some(&object_path))
                .await?;

            if let Some(old_path) = previous {
                if old_path != object_path {
                    storage
                        .remove_object(&session.access_token, &old_path)
                        .await?;
                }
            }

            println!("{}", storage.public_url(&object_path));
            Ok(())
        }
        ProfileCommands::Avatar(AvatarCommands::Remove) => {
            let previous = profiles
                .get(&user_id)
                .await?
                .and_then(|profile| profile.avatar_path);

            let Some(old_path) = previous else {
                println!("No avatar to remove");
                return Ok(());
            };

            storage
                .remove_object(&session.access_token, &old_path)
                .await?;
            profiles.set_avatar_path(&user_id, None).await?;
            println!("Avatar removed");
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileItem {
    id: String,
    email: String,
    username: String,
    avatar_url: Option<String>,
}

//! Account and session subcommands.

use std::sync::Arc;

use pazar_core::auth::{AuthSession, SignUpOutcome};
use pazar_core::data::{FavoritesClient, ListingsClient, ProfilesClient};
use pazar_core::models::UserProfile;
use pazar_core::session::{FavoritesService, SessionUser};
use pazar_core::AppSession;

use crate::auth::{clear_stored_session, load_stored_session};
use crate::cli::AuthCommands;
use crate::commands::common::{session_user_id, AppContext};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::SignUp {
            username,
            email,
            password,
        } => {
            let context = AppContext::load(global_profile)?;
            let service = context.auth_service()?;
            match service.sign_up(&username, &email, &password).await? {
                SignUpOutcome::SignedIn(session) => {
                    let label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!("Signed up and signed in as {label}");
                    let profile = fetch_profile(&context, &session).await;
                    reconcile_favorites(&context, &session, profile).await;
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!(
                        "Confirmation email sent to {email}. Confirm the address, then run `pazar auth sign-in`."
                    );
                }
            }
            Ok(())
        }
        AuthCommands::SignIn { email, password } => {
            let context = AppContext::load(global_profile)?;
            let service = context.auth_service()?;
            let session = service.sign_in(&email, &password).await?;
            let profile = fetch_profile(&context, &session).await;
            let label = profile
                .as_ref()
                .map(|profile| profile.username.clone())
                .or_else(|| session.user.email.clone())
                .unwrap_or_else(|| "(no email)".to_string());
            println!("Signed in as {label}");
            reconcile_favorites(&context, &session, profile).await;
            Ok(())
        }
        AuthCommands::SignOut => {
            let context = AppContext::load(global_profile)?;
            let stored_session = load_stored_session(&context.profile_name)?;
            if let Some(session) = stored_session {
                context
                    .auth_service()?
                    .sign_out(&session.access_token)
                    .await?;
            } else {
                clear_stored_session(&context.profile_name)?;
            }
            println!("Signed out profile '{}'", context.profile_name);
            Ok(())
        }
        AuthCommands::Status => {
            let context = AppContext::load(global_profile)?;
            let session = context.auth_service()?.restore_session().await?;
            match session {
                Some(session) => {
                    let label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Profile '{}' is signed in as {} (expires_at={})",
                        context.profile_name, label, session.expires_at
                    );
                }
                None => println!("Profile '{}' is not signed in.", context.profile_name),
            }
            Ok(())
        }
        AuthCommands::ResetPassword { email } => {
            let context = AppContext::load(global_profile)?;
            context.auth_service()?.reset_password(&email).await?;
            println!("Password recovery email sent to {email}");
            Ok(())
        }
        AuthCommands::SetPassword { new_password } => {
            let context = AppContext::load(global_profile)?;
            let session = context.require_session().await?;
            context
                .auth_service()?
                .update_password(&session.access_token, &new_password)
                .await?;
            println!("Password updated");
            Ok(())
        }
    }
}

/// Load the user's profile row for the session; absence is not an error.
async fn fetch_profile(context: &AppContext, session: &AuthSession) -> Option<UserProfile> {
    let profiles = ProfilesClient::new(&context.config)
        .ok()?
        .with_access_token(&session.access_token);
    match profiles.get(&session_user_id(session)).await {
        Ok(profile) => profile,
        Err(error) => {
            tracing::warn!("Could not load the user profile: {error}");
            None
        }
    }
}

/// Merge device favorites into the account after a session is established.
///
/// Never fails the sign-in: any problem is reported as a warning and the
/// merge retries on the next sign-in.
async fn reconcile_favorites(context: &AppContext, session: &AuthSession, profile: Option<UserProfile>) {
    let favorites_client = match FavoritesClient::new(&context.config) {
        Ok(client) => client.with_access_token(&session.access_token),
        Err(error) => {
            tracing::warn!("Skipping favorites merge, client setup failed: {error}");
            return;
        }
    };
    let listings_client = match ListingsClient::new(&context.config) {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!("Skipping favorites merge, client setup failed: {error}");
            return;
        }
    };

    let app_session = AppSession::new();
    app_session
        .sign_in(SessionUser::from(&session.user), profile)
        .await;

    let service = FavoritesService::new(
        favorites_client,
        Arc::new(context.favorites_store()),
        app_session,
    );
    if let Some(report) = service.reconcile_on_sign_in(&listings_client).await {
        println!("Favorites: {report}");
        if !report.is_complete() {
            println!("Warning: favorites merge incomplete; it will retry on the next sign-in.");
        }
    }
}

//! Pazar CLI - browse and post classified listings from the terminal.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pazar=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Auth(command) => commands::auth_cmd::run_auth(command, profile).await,
        Commands::Listings(command) => commands::listings::run_listings(command, profile).await,
        Commands::Favorites(command) => commands::favorites::run_favorites(command, profile).await,
        Commands::Profile(command) => commands::profile::run_profile(command, profile).await,
        Commands::Config(command) => commands::config::run_config(command, profile),
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())
        }
    }
}

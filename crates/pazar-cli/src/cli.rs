//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pazar")]
#[command(about = "Browse and post classified listings from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name selecting backend configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Account and session management
    #[command(subcommand)]
    Auth(AuthCommands),
    /// Browse, post, and manage listings
    #[command(subcommand)]
    Listings(ListingCommands),
    /// Favorite listings
    #[command(subcommand)]
    Favorites(FavoriteCommands),
    /// Profile and avatar
    #[command(subcommand)]
    Profile(ProfileCommands),
    /// CLI configuration profiles
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Create an account and sign in
    SignUp {
        /// Public display name
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in and merge device favorites into the account
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Revoke the stored session
    SignOut,
    /// Show the stored session state
    Status,
    /// Send a password recovery email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password for the signed-in account
    SetPassword {
        #[arg(long, value_name = "PASSWORD")]
        new_password: String,
    },
}

#[derive(Subcommand)]
pub enum ListingCommands {
    /// Newest listings
    Latest {
        /// Number of listings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search listings by title
    Search {
        /// Search query
        query: String,
        /// Number of listings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Listings posted by the signed-in user
    Mine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one listing in full
    Show {
        /// Listing ID
        id: String,
    },
    /// Post a new listing
    Create {
        #[arg(long)]
        title: String,
        /// Contact phone number
        #[arg(long)]
        phone: String,
        #[arg(long)]
        description: Option<String>,
        /// Path to a thumbnail image to upload
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
    },
    /// Edit an owned listing
    Edit {
        /// Listing ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Path to a replacement thumbnail image
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
        /// Remove the current thumbnail
        #[arg(long, conflicts_with = "image")]
        remove_image: bool,
    },
    /// Delete an owned listing and its uploaded images
    Delete {
        /// Listing ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum FavoriteCommands {
    /// Show the current favorite listings
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a listing's favorite state
    Toggle {
        /// Listing ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the signed-in user's profile
    Show,
    /// Manage the profile avatar
    #[command(subcommand)]
    Avatar(AvatarCommands),
}

#[derive(Subcommand)]
pub enum AvatarCommands {
    /// Upload a new avatar image
    Set {
        /// Path to the image file
        path: PathBuf,
    },
    /// Remove the current avatar
    Remove,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update a configuration profile
    Init {
        /// Profile to write (defaults to the active profile)
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Backend project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Backend anon key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Storage bucket for uploaded images
        #[arg(long, value_name = "NAME")]
        bucket: Option<String>,
        /// Do not make this profile the active one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show configured profiles
    Show,
    /// Make a profile the active one
    UseProfile {
        /// Profile name
        name: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

//! Configuration profile subcommands.

use pazar_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            bucket,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            supabase_url,
            supabase_anon_key,
            bucket,
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
        ConfigCommands::UseProfile { name } => run_config_use_profile(&name),
    }
}

fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    bucket: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    if let Some(url) = normalize_text_option(supabase_url.clone()) {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "Backend URL must include http:// or https://".to_string(),
            ));
        }
    }

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = normalize_text_option(supabase_url) {
        profile.supabase_url = Some(url);
    }
    if let Some(key) = normalize_text_option(supabase_anon_key) {
        profile.supabase_anon_key = Some(key);
    }
    if let Some(bucket) = normalize_text_option(bucket) {
        profile.storage_bucket = Some(bucket);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved profile '{}' to {}", profile_name, path.display());
    Ok(())
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let effective = config.resolve_profile_name(global_profile);

    if config.profiles.is_empty() {
        println!("No profiles configured. Run `pazar config init` first.");
        return Ok(());
    }

    for (name, profile) in &config.profiles {
        let marker = if *name == effective { "*" } else { " " };
        println!("{marker} {name}");
        println!(
            "    url: {}",
            profile.supabase_url().as_deref().unwrap_or("(unset)")
        );
        println!(
            "    anon key: {}",
            profile
                .supabase_anon_key()
                .as_deref()
                .map_or("(unset)".to_string(), mask_key)
        );
        println!(
            "    bucket: {}",
            profile.storage_bucket().as_deref().unwrap_or("(default)")
        );
    }
    Ok(())
}

fn run_config_use_profile(name: &str) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = name.trim();
    if !config.profiles.contains_key(name) {
        return Err(CliError::Config(format!(
            "Profile '{name}' is not configured. Run `pazar config init --profile {name}` first."
        )));
    }
    config.active_profile = Some(name.to_string());
    config.save().map_err(CliError::Config)?;
    println!("Active profile is now '{name}'");
    Ok(())
}

/// Keep only the key's tail visible in terminal output.
pub fn mask_key(key: &str) -> String {
    let visible: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{visible}")
}

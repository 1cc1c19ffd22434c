use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use crate::commands::common::{
    format_listing_lines, format_timestamp, normalize_search_query, parse_listing_id,
    title_preview,
};
use crate::commands::config::mask_key;
use crate::config_profiles::{normalize_profile_name, CliProfile, CliProfilesConfig};
use crate::error::CliError;

use chrono::TimeZone;
use pazar_core::models::{Listing, UserId};

#[test]
fn normalize_profile_name_rejects_empty() {
    assert_eq!(normalize_profile_name(None), None);
    assert_eq!(normalize_profile_name(Some(" ")), None);
    assert_eq!(normalize_profile_name(Some(" work ")), Some("work".to_string()));
}

#[test]
fn resolve_profile_name_prefers_explicit_then_active() {
    let config = CliProfilesConfig {
        version: 1,
        active_profile: Some("work".to_string()),
        profiles: BTreeMap::new(),
    };
    assert_eq!(config.resolve_profile_name(Some("mobile")), "mobile");
    assert_eq!(config.resolve_profile_name(None), "work");

    let empty = CliProfilesConfig::default();
    assert_eq!(empty.resolve_profile_name(None), "default");
}

#[test]
fn config_roundtrip_preserves_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli-config.json");

    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: Some("default".to_string()),
        profiles: BTreeMap::new(),
    };
    config.profiles.insert(
        "default".to_string(),
        CliProfile {
            supabase_url: Some(" https://project.supabase.co ".to_string()),
            supabase_anon_key: Some(" anon-key ".to_string()),
            storage_bucket: None,
        },
    );

    config.save_to_path(&path).unwrap();
    let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
    let profile = loaded.profiles.get("default").unwrap();
    assert_eq!(
        profile.supabase_url.as_deref(),
        Some("https://project.supabase.co")
    );
    assert_eq!(profile.supabase_anon_key.as_deref(), Some("anon-key"));
    assert_eq!(profile.storage_bucket, None);
}

#[test]
fn missing_config_file_loads_as_default() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = CliProfilesConfig::load_from_path(&dir.path().join("nope.json")).unwrap();
    assert_eq!(loaded, CliProfilesConfig::default());
}

#[test]
fn parse_listing_id_accepts_uuid_and_rejects_garbage() {
    assert!(parse_listing_id("c4655a5c-d611-4b5d-b924-d9e90e77902a").is_ok());
    assert!(parse_listing_id("  c4655a5c-d611-4b5d-b924-d9e90e77902a  ").is_ok());
    assert!(matches!(
        parse_listing_id("not-a-uuid"),
        Err(CliError::InvalidListingId(_))
    ));
}

#[test]
fn normalize_search_query_rejects_blank_input() {
    assert!(matches!(
        normalize_search_query("  "),
        Err(CliError::EmptySearchQuery)
    ));
    assert_eq!(normalize_search_query(" tires ").unwrap(), "tires");
}

#[test]
fn mask_key_keeps_only_the_tail() {
    assert_eq!(mask_key("abcdefgh"), "...efgh");
    assert_eq!(mask_key("key"), "...key");
}

#[test]
fn title_preview_truncates_with_ellipsis() {
    assert_eq!(title_preview("Short title", 48), "Short title");
    assert_eq!(
        title_preview("A very long listing title that keeps going", 20),
        "A very long listi..."
    );
    assert_eq!(title_preview("First line\nSecond line", 48), "First line");
}

#[test]
fn listing_lines_include_id_and_phone() {
    let listing = Listing {
        listing_id: "c4655a5c-d611-4b5d-b924-d9e90e77902a".parse().unwrap(),
        title: "Winter tires".to_string(),
        phone_number: "0888123456".to_string(),
        description: None,
        thumbnail_path: None,
        creator_id: UserId::from("u1"),
        created_at: chrono::Utc.with_ymd_and_hms(2024, 9, 12, 20, 18, 23).unwrap(),
    };

    let lines = format_listing_lines(std::slice::from_ref(&listing));
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("c4655a5c-d611-4b5d-b924-d9e90e77902a"));
    assert!(lines[0].contains("0888123456"));
    assert!(lines[0].contains("Winter tires"));
}

#[test]
fn format_timestamp_is_utc_labelled() {
    let timestamp = chrono::Utc.with_ymd_and_hms(2024, 9, 12, 20, 18, 0).unwrap();
    assert_eq!(format_timestamp(timestamp), "2024-09-12 20:18 UTC");
}

//! Device-local favorites persistence.
//!
//! The pre-login favorite set lives under one namespaced key in an opaque
//! string store, as a JSON-encoded array of `{"listing_id": ...}` objects.
//! Every mutation overwrites the whole value; the store itself provides no
//! locking, so the wrapper serializes read-modify-write through an async
//! mutex scoped to one in-flight caller at a time.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{FavoriteRef, ListingId};

/// Namespace key holding the device favorite set.
pub const FAVORITES_KEY: &str = "favorites";

/// Opaque string persistence, keyed by a fixed namespace string.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<StdMutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// The device-scoped favorite set, usable before authentication exists.
pub struct LocalFavoritesStore<S: KeyValueStore> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> LocalFavoritesStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The currently stored set.
    ///
    /// Never fails: a missing key is an empty set, and a malformed or
    /// unreadable value degrades to an empty set with a warning; an
    /// unconfirmed local cache is acceptable to lose.
    pub async fn read_all(&self) -> HashSet<FavoriteRef> {
        let _guard = self.write_lock.lock().await;
        self.read_set()
    }

    /// Flip membership of `listing_id` and persist the updated set.
    ///
    /// Returns the new set. Calling twice with the same id restores the
    /// original state.
    pub async fn toggle(&self, listing_id: ListingId) -> Result<HashSet<FavoriteRef>> {
        let _guard = self.write_lock.lock().await;

        let mut set = self.read_set();
        let favorite = FavoriteRef::new(listing_id);
        if !set.remove(&favorite) {
            set.insert(favorite);
        }
        self.write_set(&set)?;
        Ok(set)
    }

    /// Erase the stored set entirely.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(FAVORITES_KEY)
    }

    fn read_set(&self) -> HashSet<FavoriteRef> {
        let raw = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashSet::new(),
            Err(error) => {
                tracing::warn!("Failed to read local favorites, treating as empty: {error}");
                return HashSet::new();
            }
        };

        match serde_json::from_str::<Vec<FavoriteRef>>(&raw) {
            Ok(refs) => refs.into_iter().collect(),
            Err(error) => {
                tracing::warn!("Corrupt local favorites payload, treating as empty: {error}");
                HashSet::new()
            }
        }
    }

    fn write_set(&self, set: &HashSet<FavoriteRef>) -> Result<()> {
        // Deterministic order keeps the persisted file diff-friendly.
        let mut refs: Vec<&FavoriteRef> = set.iter().collect();
        refs.sort_by_key(|favorite| favorite.listing_id.to_string());
        let raw = serde_json::to_string(&refs)?;
        self.store.set(FAVORITES_KEY, &raw)
    }
}

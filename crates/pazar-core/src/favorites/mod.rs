//! Device-local favorites cache and the sign-in reconciliation routine.

pub mod local;
pub mod reconcile;

pub use local::{JsonFileStore, KeyValueStore, LocalFavoritesStore, MemoryStore};
pub use reconcile::{FavoritesReconciler, ReconcilePhase, ReconcileReport};

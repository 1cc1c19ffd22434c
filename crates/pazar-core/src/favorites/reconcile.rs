//! Sign-in reconciliation of device-local and server-side favorites.
//!
//! Runs exactly once per successful sign-in, before the favorites view is
//! read: every still-valid locally favorited listing ends up in the remote
//! set, with no duplicate rows and no silent loss. The routine never fails
//! the sign-in flow: per-item errors are logged and folded into an
//! aggregate report, and the terminal phase is always `Published`.

use std::collections::HashSet;
use std::fmt;

use futures::future::join_all;

use crate::data::{FavoritesRepository, ListingsRepository};
use crate::favorites::local::{KeyValueStore, LocalFavoritesStore};
use crate::models::{FavoriteRef, ListingId, UserId};

/// Progress of a single reconciliation run.
///
/// `Published` is terminal even under partial failure; there is no failed
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcilePhase {
    Idle,
    FetchingRemote,
    FetchingLocal,
    ValidatingListings,
    Diffing,
    Writing,
    Published,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::FetchingRemote => "fetching-remote",
            Self::FetchingLocal => "fetching-local",
            Self::ValidatingListings => "validating-listings",
            Self::Diffing => "diffing",
            Self::Writing => "writing",
            Self::Published => "published",
        };
        write!(f, "{label}")
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// The published favorites set, the session's source of truth.
    pub favorites: HashSet<FavoriteRef>,
    /// Rows inserted remotely during this run.
    pub added: usize,
    /// Valid local refs that were already recorded remotely.
    pub already_present: usize,
    /// Local refs dropped because their listing no longer exists.
    pub pruned: usize,
    /// Local refs whose existence check failed; kept locally, retried on a
    /// later sign-in.
    pub unresolved: Vec<ListingId>,
    /// Insert attempts that failed for reasons other than a duplicate row.
    pub failed_adds: usize,
    /// The authoritative set could not be fetched at the start of the run.
    pub remote_unavailable: bool,
}

impl ReconcileReport {
    /// Whether every local favorite was fully reconciled.
    ///
    /// `false` is a warning, not a failure: the run still published a
    /// favorites set and is safe to repeat on the next sign-in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.remote_unavailable && self.unresolved.is_empty() && self.failed_adds == 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} favorites ({} added, {} pruned, {} unresolved, {} failed)",
            self.favorites.len(),
            self.added,
            self.pruned,
            self.unresolved.len(),
            self.failed_adds
        )
    }
}

/// Merges the anonymous local favorite set into the user's remote set.
pub struct FavoritesReconciler<'a, F, L, S>
where
    F: FavoritesRepository,
    L: ListingsRepository,
    S: KeyValueStore,
{
    remote: &'a F,
    listings: &'a L,
    local: &'a LocalFavoritesStore<S>,
}

impl<'a, F, L, S> FavoritesReconciler<'a, F, L, S>
where
    F: FavoritesRepository,
    L: ListingsRepository,
    S: KeyValueStore,
{
    pub const fn new(remote: &'a F, listings: &'a L, local: &'a LocalFavoritesStore<S>) -> Self {
        Self {
            remote,
            listings,
            local,
        }
    }

    /// Run the reconciliation for a freshly signed-in user.
    ///
    /// The local set is read-only input: it keeps serving as the pre-login
    /// cache for the next logged-out session on this device.
    pub async fn run(&self, user_id: &UserId) -> ReconcileReport {
        let mut phase = ReconcilePhase::Idle;
        let mut report = ReconcileReport::default();

        advance(&mut phase, ReconcilePhase::FetchingRemote);
        let remote_set: HashSet<FavoriteRef> = match self.remote.list_by_user(user_id).await {
            Ok(refs) => refs.into_iter().collect(),
            Err(error) => {
                tracing::warn!("Could not fetch remote favorites for {user_id}: {error}");
                report.remote_unavailable = true;
                HashSet::new()
            }
        };

        advance(&mut phase, ReconcilePhase::FetchingLocal);
        let local_set = self.local.read_all().await;
        if local_set.is_empty() {
            advance(&mut phase, ReconcilePhase::Published);
            report.favorites = remote_set;
            return report;
        }

        advance(&mut phase, ReconcilePhase::ValidatingListings);
        let checks = join_all(local_set.iter().map(|favorite| {
            let listings = self.listings;
            let favorite = favorite.clone();
            async move {
                let verdict = listings.exists(&favorite.listing_id).await;
                (favorite, verdict)
            }
        }))
        .await;

        let mut valid_set: HashSet<FavoriteRef> = HashSet::new();
        for (favorite, verdict) in checks {
            match verdict {
                Ok(true) => {
                    valid_set.insert(favorite);
                }
                Ok(false) => {
                    report.pruned += 1;
                }
                Err(error) => {
                    // Keep rather than drop: a transient fault must not cost
                    // the user a favorite.
                    if error.is_connectivity() {
                        tracing::warn!(
                            "Existence check for {} hit a connectivity fault, keeping for a later run: {error}",
                            favorite.listing_id
                        );
                    } else {
                        tracing::warn!(
                            "Existence check for {} failed, keeping for a later run: {error}",
                            favorite.listing_id
                        );
                    }
                    report.unresolved.push(favorite.listing_id);
                }
            }
        }

        advance(&mut phase, ReconcilePhase::Diffing);
        let missing: Vec<&FavoriteRef> = valid_set.difference(&remote_set).collect();
        report.already_present = valid_set.len() - missing.len();

        advance(&mut phase, ReconcilePhase::Writing);
        let mut added_refs: Vec<FavoriteRef> = Vec::new();
        if report.remote_unavailable {
            // The dedup rule needs the remote set; without it, inserting
            // would risk duplicate rows. Leave the writes to the next run.
        } else if !missing.is_empty() {
            let writes = join_all(missing.into_iter().map(|favorite| {
                let remote = self.remote;
                let favorite = favorite.clone();
                async move {
                    let outcome = remote.add(user_id, &favorite.listing_id).await;
                    (favorite, outcome)
                }
            }))
            .await;

            for (favorite, outcome) in writes {
                match outcome {
                    Ok(()) => {
                        report.added += 1;
                        added_refs.push(favorite);
                    }
                    Err(error) if error.is_constraint() => {
                        // The row exists already, which is exactly the state
                        // this run wanted to reach.
                        tracing::debug!(
                            "Favorite {} already recorded remotely: {error}",
                            favorite.listing_id
                        );
                        report.already_present += 1;
                        added_refs.push(favorite);
                    }
                    Err(error) => {
                        tracing::warn!(
                            "Failed to record favorite {} remotely: {error}",
                            favorite.listing_id
                        );
                        report.failed_adds += 1;
                    }
                }
            }
        }

        advance(&mut phase, ReconcilePhase::Published);
        report.favorites = self
            .published_set(user_id, remote_set, added_refs, report.remote_unavailable, &valid_set)
            .await;
        report
    }

    /// Resolve the set published as the session's source of truth.
    async fn published_set(
        &self,
        user_id: &UserId,
        remote_set: HashSet<FavoriteRef>,
        added_refs: Vec<FavoriteRef>,
        remote_unavailable: bool,
        valid_set: &HashSet<FavoriteRef>,
    ) -> HashSet<FavoriteRef> {
        if remote_unavailable {
            // Best effort: show the valid device favorites until the remote
            // table is reachable again.
            return valid_set.clone();
        }
        if added_refs.is_empty() {
            return remote_set;
        }

        match self.remote.list_by_user(user_id).await {
            Ok(refs) => refs.into_iter().collect(),
            Err(error) => {
                tracing::warn!("Could not re-fetch favorites after writes, publishing union: {error}");
                let mut union = remote_set;
                union.extend(added_refs);
                union
            }
        }
    }
}

fn advance(phase: &mut ReconcilePhase, next: ReconcilePhase) {
    tracing::debug!("Favorites reconciliation: {phase} -> {next}");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::{Error, Result};
    use crate::favorites::local::MemoryStore;

    const ID_A: &str = "11111111-1111-4111-8111-111111111111";
    const ID_B: &str = "22222222-2222-4222-8222-222222222222";
    const ID_C: &str = "33333333-3333-4333-8333-333333333333";

    fn listing(id: &str) -> ListingId {
        id.parse().unwrap()
    }

    #[derive(Default)]
    struct FakeFavorites {
        rows: Mutex<HashSet<ListingId>>,
        fail_list: Mutex<bool>,
        fail_add_for: Mutex<HashSet<ListingId>>,
        conflict_for: Mutex<HashSet<ListingId>>,
        add_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl FakeFavorites {
        fn with_rows(ids: &[&str]) -> Self {
            let favorites = Self::default();
            let mut rows = favorites.rows.lock().unwrap();
            for id in ids {
                rows.insert(listing(id));
            }
            drop(rows);
            favorites
        }

        fn row_ids(&self) -> HashSet<ListingId> {
            self.rows.lock().unwrap().clone()
        }
    }

    impl FavoritesRepository for FakeFavorites {
        async fn list_by_user(&self, _user_id: &UserId) -> Result<Vec<FavoriteRef>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_list.lock().unwrap() {
                return Err(Error::Api("favorites table unavailable (503)".to_string()));
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .copied()
                .map(FavoriteRef::new)
                .collect())
        }

        async fn add(&self, _user_id: &UserId, listing_id: &ListingId) -> Result<()> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_add_for.lock().unwrap().contains(listing_id) {
                return Err(Error::Api("connection reset by peer".to_string()));
            }
            if self.conflict_for.lock().unwrap().contains(listing_id) {
                return Err(Error::Constraint(
                    "duplicate key value violates unique constraint (409)".to_string(),
                ));
            }
            self.rows.lock().unwrap().insert(*listing_id);
            Ok(())
        }

        async fn remove(&self, _user_id: &UserId, listing_id: &ListingId) -> Result<()> {
            self.rows.lock().unwrap().remove(listing_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeListings {
        existing: HashSet<ListingId>,
        failing: HashSet<ListingId>,
        exists_calls: AtomicUsize,
    }

    impl FakeListings {
        fn with_existing(ids: &[&str]) -> Self {
            Self {
                existing: ids.iter().map(|id| listing(id)).collect(),
                ..Self::default()
            }
        }

        fn failing_for(mut self, ids: &[&str]) -> Self {
            self.failing = ids.iter().map(|id| listing(id)).collect();
            self
        }
    }

    impl ListingsRepository for FakeListings {
        async fn exists(&self, listing_id: &ListingId) -> Result<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(listing_id) {
                return Err(Error::Api("connect timeout".to_string()));
            }
            Ok(self.existing.contains(listing_id))
        }
    }

    async fn local_with(ids: &[&str]) -> LocalFavoritesStore<MemoryStore> {
        let store = LocalFavoritesStore::new(MemoryStore::new());
        for id in ids {
            store.toggle(listing(id)).await.unwrap();
        }
        store
    }

    fn user() -> UserId {
        UserId::from("user-1")
    }

    #[tokio::test]
    async fn merges_valid_local_refs_into_empty_remote() {
        let favorites = FakeFavorites::default();
        let listings = FakeListings::with_existing(&[ID_A, ID_B]);
        let local = local_with(&[ID_A, ID_B]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(report.added, 2);
        assert_eq!(report.pruned, 0);
        assert!(report.is_complete());
        assert_eq!(
            favorites.row_ids(),
            [listing(ID_A), listing(ID_B)].into_iter().collect()
        );
        assert_eq!(report.favorites.len(), 2);
    }

    #[tokio::test]
    async fn full_overlap_triggers_zero_adds() {
        let favorites = FakeFavorites::with_rows(&[ID_A]);
        let listings = FakeListings::with_existing(&[ID_A]);
        let local = local_with(&[ID_A]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.added, 0);
        assert_eq!(report.already_present, 1);
        assert_eq!(favorites.row_ids(), [listing(ID_A)].into_iter().collect());
    }

    #[tokio::test]
    async fn deleted_listing_is_pruned_not_added() {
        let favorites = FakeFavorites::default();
        let listings = FakeListings::with_existing(&[]);
        let local = local_with(&[ID_A]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(report.pruned, 1);
        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), 0);
        assert!(favorites.row_ids().is_empty());
        // Pruning affects the merge input only, never the device cache.
        assert_eq!(local.read_all().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_local_set_only_fetches_remote() {
        let favorites = FakeFavorites::with_rows(&[ID_A]);
        let listings = FakeListings::with_existing(&[ID_A]);
        let local = local_with(&[]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(listings.exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(favorites.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.favorites.len(), 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn failed_existence_check_keeps_ref_unresolved() {
        let favorites = FakeFavorites::default();
        let listings = FakeListings::with_existing(&[]).failing_for(&[ID_A]);
        let local = local_with(&[ID_A]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(report.unresolved, vec![listing(ID_A)]);
        assert_eq!(report.pruned, 0);
        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), 0);
        assert!(!report.is_complete());
        // The ref survives locally for the next sign-in.
        assert_eq!(local.read_all().await.len(), 1);
    }

    #[tokio::test]
    async fn one_failed_add_does_not_abort_the_batch() {
        let favorites = FakeFavorites::default();
        *favorites.fail_add_for.lock().unwrap() = [listing(ID_B)].into_iter().collect();
        let listings = FakeListings::with_existing(&[ID_A, ID_B, ID_C]);
        let local = local_with(&[ID_A, ID_B, ID_C]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(report.added, 2);
        assert_eq!(report.failed_adds, 1);
        assert!(!report.is_complete());
        assert_eq!(
            favorites.row_ids(),
            [listing(ID_A), listing(ID_C)].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn duplicate_row_counts_as_already_present() {
        let favorites = FakeFavorites::default();
        *favorites.conflict_for.lock().unwrap() = [listing(ID_A)].into_iter().collect();
        let listings = FakeListings::with_existing(&[ID_A]);
        let local = local_with(&[ID_A]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert_eq!(report.added, 0);
        assert_eq!(report.failed_adds, 0);
        assert_eq!(report.already_present, 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn second_run_performs_zero_adds() {
        let favorites = FakeFavorites::default();
        let listings = FakeListings::with_existing(&[ID_A, ID_B]);
        let local = local_with(&[ID_A, ID_B]).await;

        let reconciler = FavoritesReconciler::new(&favorites, &listings, &local);
        let first = reconciler.run(&user()).await;
        assert_eq!(first.added, 2);

        let adds_after_first = favorites.add_calls.load(Ordering::SeqCst);
        let second = reconciler.run(&user()).await;
        assert_eq!(second.added, 0);
        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), adds_after_first);
        assert_eq!(second.favorites, first.favorites);
    }

    #[tokio::test]
    async fn unavailable_remote_skips_writes_and_publishes_device_view() {
        let favorites = FakeFavorites::default();
        *favorites.fail_list.lock().unwrap() = true;
        let listings = FakeListings::with_existing(&[ID_A]);
        let local = local_with(&[ID_A]).await;

        let report = FavoritesReconciler::new(&favorites, &listings, &local)
            .run(&user())
            .await;

        assert!(report.remote_unavailable);
        assert!(!report.is_complete());
        assert_eq!(favorites.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.favorites, local.read_all().await);
    }

    #[test]
    fn report_summary_reads_naturally() {
        let report = ReconcileReport {
            favorites: [FavoriteRef::new(listing(ID_A))].into_iter().collect(),
            added: 1,
            ..ReconcileReport::default()
        };
        assert_eq!(
            report.to_string(),
            "1 favorites (1 added, 0 pruned, 0 unresolved, 0 failed)"
        );
    }
}

//! Explicit application session state.
//!
//! Session, user, and favorites state is carried by a passed-around
//! [`AppSession`] value rather than ambient globals, so the favorites
//! routines take their inputs as plain arguments. Lifecycle: created empty
//! at app start, populated on sign-in, cleared on sign-out.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthUser;
use crate::data::{FavoritesRepository, ListingsRepository};
use crate::error::Result;
use crate::favorites::local::{KeyValueStore, LocalFavoritesStore};
use crate::favorites::reconcile::{FavoritesReconciler, ReconcileReport};
use crate::models::{FavoriteRef, ListingId, UserId, UserProfile};

/// Identity of the signed-in user, as known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl From<&AuthUser> for SessionUser {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: UserId::from(user.id.clone()),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    user: Option<SessionUser>,
    profile: Option<UserProfile>,
    favorites: HashSet<FavoriteRef>,
    reconciled: bool,
}

/// Thread-safe, clonable session handle shared across app surfaces.
#[derive(Clone, Default)]
pub struct AppSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl AppSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the session after a successful sign-in.
    ///
    /// Favorites stay empty until a reconciliation run publishes them.
    pub async fn sign_in(&self, user: SessionUser, profile: Option<UserProfile>) {
        let mut inner = self.inner.lock().await;
        *inner = SessionInner {
            user: Some(user),
            profile,
            favorites: HashSet::new(),
            reconciled: false,
        };
    }

    /// Clear all session state on sign-out.
    pub async fn sign_out(&self) {
        let mut inner = self.inner.lock().await;
        *inner = SessionInner::default();
    }

    pub async fn is_signed_in(&self) -> bool {
        self.inner.lock().await.user.is_some()
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.inner.lock().await.user.clone()
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.inner.lock().await.user.as_ref().map(|user| user.id.clone())
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.lock().await.profile.clone()
    }

    /// The published favorites set for this session.
    pub async fn favorites(&self) -> HashSet<FavoriteRef> {
        self.inner.lock().await.favorites.clone()
    }

    pub async fn is_favorite(&self, listing_id: ListingId) -> bool {
        self.inner
            .lock()
            .await
            .favorites
            .contains(&FavoriteRef::new(listing_id))
    }

    /// Claim the one reconciliation run this sign-in is entitled to.
    ///
    /// Returns the user id the run should target, or `None` when signed out
    /// or when a run already happened for this session.
    pub async fn begin_reconcile(&self) -> Option<UserId> {
        let mut inner = self.inner.lock().await;
        if inner.reconciled {
            return None;
        }
        let user_id = inner.user.as_ref().map(|user| user.id.clone())?;
        inner.reconciled = true;
        Some(user_id)
    }

    /// Install the reconciled favorites as the session's source of truth.
    pub async fn publish_favorites(&self, favorites: HashSet<FavoriteRef>) {
        let mut inner = self.inner.lock().await;
        inner.favorites = favorites;
    }

    async fn set_favorite(&self, listing_id: ListingId, favored: bool) {
        let mut inner = self.inner.lock().await;
        if favored {
            inner.favorites.insert(FavoriteRef::new(listing_id));
        } else {
            inner.favorites.remove(&FavoriteRef::new(listing_id));
        }
    }
}

/// Write-through favorites facade over the session, the device cache, and
/// the remote table.
pub struct FavoritesService<F, S>
where
    F: FavoritesRepository,
    S: KeyValueStore,
{
    remote: F,
    local: Arc<LocalFavoritesStore<S>>,
    session: AppSession,
}

impl<F, S> FavoritesService<F, S>
where
    F: FavoritesRepository,
    S: KeyValueStore,
{
    pub fn new(remote: F, local: Arc<LocalFavoritesStore<S>>, session: AppSession) -> Self {
        Self {
            remote,
            local,
            session,
        }
    }

    /// Run the sign-in reconciliation, at most once per session.
    ///
    /// Returns `None` when signed out or already reconciled. The report is
    /// informational; a partial run still publishes a favorites set.
    pub async fn reconcile_on_sign_in<L: ListingsRepository>(
        &self,
        listings: &L,
    ) -> Option<ReconcileReport> {
        let user_id = self.session.begin_reconcile().await?;
        let reconciler = FavoritesReconciler::new(&self.remote, listings, &self.local);
        let report = reconciler.run(&user_id).await;
        self.session.publish_favorites(report.favorites.clone()).await;
        Some(report)
    }

    /// Flip a listing's favorite state for the current identity.
    ///
    /// Signed out, the flip lands in the device cache. Signed in, the
    /// session set updates immediately and the server write follows; a
    /// failed write rolls the optimistic flip back.
    pub async fn toggle(&self, listing_id: ListingId) -> Result<bool> {
        let Some(user_id) = self.session.user_id().await else {
            let set = self.local.toggle(listing_id).await?;
            return Ok(set.contains(&FavoriteRef::new(listing_id)));
        };

        let was_favorite = self.session.is_favorite(listing_id).await;
        let now_favorite = !was_favorite;
        self.session.set_favorite(listing_id, now_favorite).await;

        let write = if was_favorite {
            self.remote.remove(&user_id, &listing_id).await
        } else {
            self.remote.add(&user_id, &listing_id).await
        };

        match write {
            Ok(()) => Ok(now_favorite),
            Err(error) if error.is_constraint() => {
                // The row was already there; the optimistic state is right.
                tracing::debug!("Favorite {listing_id} already recorded remotely: {error}");
                Ok(now_favorite)
            }
            Err(error) => {
                tracing::warn!("Favorite write for {listing_id} failed, rolling back: {error}");
                self.session.set_favorite(listing_id, was_favorite).await;
                Err(error)
            }
        }
    }

    /// The favorite set backing the favorites view for the current identity.
    pub async fn current(&self) -> HashSet<FavoriteRef> {
        if self.session.is_signed_in().await {
            self.session.favorites().await
        } else {
            self.local.read_all().await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::favorites::local::MemoryStore;

    const ID_A: &str = "11111111-1111-4111-8111-111111111111";
    const ID_B: &str = "22222222-2222-4222-8222-222222222222";

    fn listing(id: &str) -> ListingId {
        id.parse().unwrap()
    }

    fn session_user() -> SessionUser {
        SessionUser {
            id: UserId::from("user-1"),
            email: Some("ani@example.com".to_string()),
            username: Some("ani".to_string()),
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        rows: StdMutex<HashSet<ListingId>>,
        fail_writes: StdMutex<bool>,
        add_calls: AtomicUsize,
    }

    impl FavoritesRepository for FakeRemote {
        async fn list_by_user(&self, _user_id: &UserId) -> Result<Vec<FavoriteRef>> {
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
            if *self.fail_writes.lock().unwrap() {
                return Err(Error::Api("gateway timeout (504)".to_string()));
            }
            self.rows.lock().unwrap().insert(*listing_id);
            Ok(())
        }

        async fn remove(&self, _user_id: &UserId, listing_id: &ListingId) -> Result<()> {
            if *self.fail_writes.lock().unwrap() {
                return Err(Error::Api("gateway timeout (504)".to_string()));
            }
            self.rows.lock().unwrap().remove(listing_id);
            Ok(())
        }
    }

    struct AllListingsExist;

    impl ListingsRepository for AllListingsExist {
        async fn exists(&self, _listing_id: &ListingId) -> Result<bool> {
            Ok(true)
        }
    }

    fn service(
        session: AppSession,
    ) -> FavoritesService<FakeRemote, MemoryStore> {
        FavoritesService::new(
            FakeRemote::default(),
            Arc::new(LocalFavoritesStore::new(MemoryStore::new())),
            session,
        )
    }

    #[tokio::test]
    async fn session_lifecycle_clears_state() {
        let session = AppSession::new();
        assert!(!session.is_signed_in().await);

        let profile = UserProfile {
            id: UserId::from("user-1"),
            email: "ani@example.com".to_string(),
            username: "ani".to_string(),
            avatar_path: None,
        };
        session.sign_in(session_user(), Some(profile)).await;
        assert!(session.is_signed_in().await);
        assert_eq!(session.user().await.unwrap().id, UserId::from("user-1"));
        assert_eq!(session.profile().await.unwrap().username, "ani");
        session
            .publish_favorites([FavoriteRef::new(listing(ID_A))].into_iter().collect())
            .await;
        assert!(session.is_favorite(listing(ID_A)).await);

        session.sign_out().await;
        assert!(!session.is_signed_in().await);
        assert!(session.favorites().await.is_empty());
        assert!(session.profile().await.is_none());
    }

    #[tokio::test]
    async fn signed_out_toggle_uses_device_cache() {
        let session = AppSession::new();
        let service = service(session);

        assert!(service.toggle(listing(ID_A)).await.unwrap());
        assert_eq!(service.remote.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.current().await.len(), 1);
        assert_eq!(service.local.read_all().await.len(), 1);
    }

    #[tokio::test]
    async fn signed_in_toggle_writes_through_to_remote() {
        let session = AppSession::new();
        session.sign_in(session_user(), None).await;
        let service = service(session.clone());

        assert!(service.toggle(listing(ID_A)).await.unwrap());
        assert!(session.is_favorite(listing(ID_A)).await);
        assert_eq!(service.remote.rows.lock().unwrap().len(), 1);

        assert!(!service.toggle(listing(ID_A)).await.unwrap());
        assert!(service.remote.rows.lock().unwrap().is_empty());
        // The device cache is the pre-login set; signed-in toggles skip it.
        assert!(service.local.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_rolls_back_the_optimistic_flip() {
        let session = AppSession::new();
        session.sign_in(session_user(), None).await;
        let service = service(session.clone());
        *service.remote.fail_writes.lock().unwrap() = true;

        let result = service.toggle(listing(ID_A)).await;
        assert!(result.is_err());
        assert!(!session.is_favorite(listing(ID_A)).await);
    }

    #[tokio::test]
    async fn reconcile_runs_once_per_sign_in() {
        let session = AppSession::new();
        session.sign_in(session_user(), None).await;

        let local = Arc::new(LocalFavoritesStore::new(MemoryStore::new()));
        local.toggle(listing(ID_A)).await.unwrap();
        local.toggle(listing(ID_B)).await.unwrap();
        let service = FavoritesService::new(FakeRemote::default(), local, session.clone());

        let report = service.reconcile_on_sign_in(&AllListingsExist).await.unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(session.favorites().await.len(), 2);

        assert!(service.reconcile_on_sign_in(&AllListingsExist).await.is_none());

        // A fresh sign-in is entitled to a new run.
        session.sign_in(session_user(), None).await;
        assert!(service.reconcile_on_sign_in(&AllListingsExist).await.is_some());
    }

    #[tokio::test]
    async fn signed_out_reconcile_is_a_no_op() {
        let session = AppSession::new();
        let service = service(session);
        assert!(service.reconcile_on_sign_in(&AllListingsExist).await.is_none());
    }
}

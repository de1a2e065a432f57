//! Session resolution from the persisted selected-user anchor.
//!
//! [`SessionContext`] is resolved once, before any other component is built,
//! and hands out an [`ActiveSession`] that the rest of the app borrows.
//! Resolution never fails outward: every problem ends in "no active user",
//! which callers read as a redirect to [`UserSelection`].

use std::sync::{Arc, Mutex};

use tracing::{debug, info, instrument, warn};

use crate::domain::{AppError, BankingApi, SessionError, SessionStore, User, UserId};

use super::scope::ViewScope;

/// The resolved user, passed by reference to components that act on its behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    user: User,
}

impl ActiveSession {
    #[must_use]
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

/// What a view renders from the session: `{user, loading}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
enum SessionState {
    Resolving,
    Active(User),
    Anonymous,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        match self {
            Self::Resolving => SessionSnapshot {
                user: None,
                loading: true,
            },
            Self::Active(user) => SessionSnapshot {
                user: Some(user.clone()),
                loading: false,
            },
            Self::Anonymous => SessionSnapshot {
                user: None,
                loading: false,
            },
        }
    }
}

/// Resolves and exposes the active user
pub struct SessionContext {
    api: Arc<dyn BankingApi>,
    store: Arc<dyn SessionStore>,
    state: Mutex<SessionState>,
    scope: ViewScope,
}

impl SessionContext {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            state: Mutex::new(SessionState::Resolving),
            scope: ViewScope::new(),
        }
    }

    /// Resolve the persisted anchor into a user.
    ///
    /// Runs once; later calls return the current snapshot. If the context is
    /// torn down mid-flight it stays in the loading state and the store is
    /// left alone.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionSnapshot {
        if !matches!(*self.lock_state(), SessionState::Resolving) {
            return self.snapshot();
        }

        let user_id = match self.read_anchor() {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                debug!("No persisted selection, session is anonymous");
                return self.settle(SessionState::Anonymous);
            }
            Err(e) => {
                warn!(error = %e, "Discarding unusable session anchor");
                self.clear_anchor();
                return self.settle(SessionState::Anonymous);
            }
        };

        match self.scope.run(self.api.get_user(user_id)).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session resolved");
                self.settle(SessionState::Active(user))
            }
            Err(AppError::Cancelled) => {
                debug!(user_id = %user_id, "Session resolution cancelled");
                self.snapshot()
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Session resolution failed, clearing anchor");
                self.clear_anchor();
                self.settle(SessionState::Anonymous)
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    /// The active user, if resolution found one
    #[must_use]
    pub fn active(&self) -> Option<ActiveSession> {
        match &*self.lock_state() {
            SessionState::Active(user) => Some(ActiveSession::new(user.clone())),
            _ => None,
        }
    }

    /// Resolution finished without a user; the caller should redirect to selection
    #[must_use]
    pub fn needs_selection(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Anonymous)
    }

    /// Clear the anchor and drop the active user
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.clear_anchor();
        *self.lock_state() = SessionState::Anonymous;
        info!("Logged out");
    }

    /// Cancel any resolution still in flight
    pub fn teardown(&self) {
        self.scope.close();
    }

    fn read_anchor(&self) -> Result<Option<UserId>, AppError> {
        let Some(raw) = self.store.load()? else {
            return Ok(None);
        };
        raw.trim()
            .parse::<UserId>()
            .map(Some)
            .map_err(|_| AppError::Session(SessionError::InvalidAnchor(raw)))
    }

    fn clear_anchor(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session anchor");
        }
    }

    /// Leave `Resolving` unless logout already moved the state on
    fn settle(&self, next: SessionState) -> SessionSnapshot {
        let mut state = self.lock_state();
        if matches!(*state, SessionState::Resolving) {
            *state = next;
        }
        state.snapshot()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.scope.close();
    }
}

/// The selection screen: lists users and persists the chosen one
pub struct UserSelection {
    api: Arc<dyn BankingApi>,
    store: Arc<dyn SessionStore>,
}

impl UserSelection {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, store: Arc<dyn SessionStore>) -> Self {
        Self { api, store }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.api.list_users().await
    }

    /// Persist `user_id` as the anchor for the next session resolution
    #[instrument(skip(self))]
    pub fn select(&self, user_id: UserId) -> Result<(), AppError> {
        self.store.save(&user_id.to_string())?;
        info!(user_id = %user_id, "User selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemorySessionStore;
    use crate::test_utils::fixtures::user;
    use crate::test_utils::{MockBankingApi, MockOperation};
    use std::time::Duration;

    fn context(api: MockBankingApi, anchor: Option<&str>) -> (SessionContext, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        if let Some(value) = anchor {
            store.save(value).unwrap();
        }
        let ctx = SessionContext::new(Arc::new(api), Arc::clone(&store) as _);
        (ctx, store)
    }

    #[tokio::test]
    async fn test_loading_before_initialize() {
        let (ctx, _) = context(MockBankingApi::new(), Some("1"));
        assert_eq!(
            ctx.snapshot(),
            SessionSnapshot {
                user: None,
                loading: true
            }
        );
        assert!(!ctx.needs_selection());
    }

    #[tokio::test]
    async fn test_no_anchor_is_anonymous_without_fetch() {
        let api = Arc::new(MockBankingApi::new());
        let store = Arc::new(MemorySessionStore::new());
        let ctx = SessionContext::new(Arc::clone(&api) as _, store as _);

        let snapshot = ctx.initialize().await;

        assert_eq!(
            snapshot,
            SessionSnapshot {
                user: None,
                loading: false
            }
        );
        assert!(ctx.needs_selection());
        assert_eq!(api.call_count(MockOperation::GetUser), 0);
    }

    #[tokio::test]
    async fn test_anchor_resolves_user() {
        let api = MockBankingApi::new().with_user(user(4, "Ana"));
        let (ctx, store) = context(api, Some("4"));

        let snapshot = ctx.initialize().await;

        assert_eq!(snapshot.user.as_ref().map(|u| u.name.as_str()), Some("Ana"));
        assert!(!snapshot.loading);
        assert_eq!(ctx.active().unwrap().user_id(), 4);
        assert_eq!(store.load().unwrap().as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_failed_fetch_clears_anchor() {
        let (ctx, store) = context(MockBankingApi::failing("backend down"), Some("4"));

        let snapshot = ctx.initialize().await;

        assert!(snapshot.user.is_none());
        assert!(!snapshot.loading);
        assert!(ctx.needs_selection());
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_user_clears_anchor() {
        let (ctx, store) = context(MockBankingApi::new(), Some("99"));

        ctx.initialize().await;

        assert!(ctx.active().is_none());
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_anchor_clears_without_fetch() {
        let api = Arc::new(MockBankingApi::new());
        let store = Arc::new(MemorySessionStore::new());
        store.save("not-a-number").unwrap();
        let ctx = SessionContext::new(Arc::clone(&api) as _, Arc::clone(&store) as _);

        ctx.initialize().await;

        assert!(ctx.needs_selection());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(api.call_count(MockOperation::GetUser), 0);
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let api = Arc::new(MockBankingApi::new().with_user(user(4, "Ana")));
        let store = Arc::new(MemorySessionStore::new());
        store.save("4").unwrap();
        let ctx = SessionContext::new(Arc::clone(&api) as _, store as _);

        ctx.initialize().await;
        ctx.initialize().await;

        assert_eq!(api.call_count(MockOperation::GetUser), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_anchor_and_user() {
        let api = MockBankingApi::new().with_user(user(4, "Ana"));
        let (ctx, store) = context(api, Some("4"));
        ctx.initialize().await;

        ctx.logout();

        assert_eq!(
            ctx.snapshot(),
            SessionSnapshot {
                user: None,
                loading: false
            }
        );
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_teardown_cancels_resolution_and_keeps_anchor() {
        let api = MockBankingApi::new()
            .with_user(user(4, "Ana"))
            .with_latency(Duration::from_secs(30));
        let (ctx, store) = context(api, Some("4"));
        let ctx = Arc::new(ctx);

        let resolving = {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move { ctx.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.teardown();

        let snapshot = resolving.await.unwrap();
        assert!(snapshot.loading);
        assert_eq!(store.load().unwrap().as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_user_selection_persists_anchor() {
        let api = Arc::new(
            MockBankingApi::new()
                .with_user(user(1, "Ana"))
                .with_user(user(2, "Beto")),
        );
        let store = Arc::new(MemorySessionStore::new());
        let selection = UserSelection::new(Arc::clone(&api) as _, Arc::clone(&store) as _);

        let users = selection.list_users().await.unwrap();
        assert_eq!(users.len(), 2);

        selection.select(users[1].id).unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("2"));

        let ctx = SessionContext::new(api as _, store as _);
        ctx.initialize().await;
        assert_eq!(ctx.active().unwrap().user().name, "Beto");
    }
}

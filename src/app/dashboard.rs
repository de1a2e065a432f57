//! Accounts owned by the active user, the entry point for transfers and history.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument, warn};

use crate::domain::{Account, AccountId, AppError, BankingApi, UserId};

use super::scope::ViewScope;
use super::session::ActiveSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverviewState {
    Loading,
    Loaded(Vec<Account>),
    Unavailable(String),
}

/// The active user's account list
pub struct AccountOverview {
    api: Arc<dyn BankingApi>,
    user_id: UserId,
    state: Mutex<OverviewState>,
    scope: ViewScope,
}

impl AccountOverview {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, session: &ActiveSession) -> Self {
        Self {
            api,
            user_id: session.user_id(),
            state: Mutex::new(OverviewState::Loading),
            scope: ViewScope::new(),
        }
    }

    /// Fetch the accounts. Returns how many the user owns.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn load(&self) -> Result<usize, AppError> {
        match self.scope.run(self.api.get_accounts(self.user_id)).await {
            Ok(accounts) => {
                let count = accounts.len();
                debug!(count, "Accounts loaded");
                *self.lock_state() = OverviewState::Loaded(accounts);
                Ok(count)
            }
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Failed to load accounts");
                *self.lock_state() = OverviewState::Unavailable(e.to_string());
                Err(e)
            }
        }
    }

    /// Re-fetch after a transfer so balances are current.
    ///
    /// A failed refresh keeps the previously loaded list.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn refresh(&self) -> Result<usize, AppError> {
        match self.scope.run(self.api.get_accounts(self.user_id)).await {
            Ok(accounts) => {
                let count = accounts.len();
                *self.lock_state() = OverviewState::Loaded(accounts);
                Ok(count)
            }
            Err(e) => {
                let mut state = self.lock_state();
                if !matches!(*state, OverviewState::Loaded(_)) && e != AppError::Cancelled {
                    *state = OverviewState::Unavailable(e.to_string());
                }
                warn!(error = %e, transient = e.is_transient(), "Account refresh failed");
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> OverviewState {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        match &*self.lock_state() {
            OverviewState::Loaded(accounts) => accounts.clone(),
            _ => Vec::new(),
        }
    }

    /// Look up one of the user's accounts, e.g. as a transfer source
    #[must_use]
    pub fn find(&self, account_id: AccountId) -> Option<Account> {
        match &*self.lock_state() {
            OverviewState::Loaded(accounts) => accounts.iter().find(|a| a.id == account_id).cloned(),
            _ => None,
        }
    }

    pub fn teardown(&self) {
        self.scope.close();
    }

    fn lock_state(&self) -> MutexGuard<'_, OverviewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AccountOverview {
    fn drop(&mut self) {
        self.scope.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{account, dec, user};
    use crate::test_utils::{MockBankingApi, MockOperation};

    fn session() -> ActiveSession {
        ActiveSession::new(user(1, "Ana"))
    }

    #[tokio::test]
    async fn test_load_and_find() {
        let api = MockBankingApi::new().with_accounts(
            1,
            vec![account(10, "1111222233334444", "150.00"), account(11, "5555", "3")],
        );
        let overview = AccountOverview::new(Arc::new(api), &session());
        assert_eq!(overview.state(), OverviewState::Loading);

        assert_eq!(overview.load().await.unwrap(), 2);
        assert_eq!(overview.find(10).unwrap().balance, dec("150.00"));
        assert!(overview.find(99).is_none());
    }

    #[tokio::test]
    async fn test_load_failure_is_unavailable() {
        let overview = AccountOverview::new(Arc::new(MockBankingApi::failing("down")), &session());

        assert!(overview.load().await.is_err());
        assert!(matches!(overview.state(), OverviewState::Unavailable(_)));
        assert!(overview.accounts().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_balance() {
        let api = Arc::new(
            MockBankingApi::new().with_accounts(1, vec![account(10, "1111", "150.00")]),
        );
        let overview = AccountOverview::new(Arc::clone(&api) as _, &session());
        overview.load().await.unwrap();

        api.set_accounts(1, vec![account(10, "1111", "100.00")]);
        overview.refresh().await.unwrap();

        assert_eq!(overview.find(10).unwrap().balance, dec("100.00"));
        assert_eq!(api.call_count(MockOperation::GetAccounts), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let api = Arc::new(
            MockBankingApi::new().with_accounts(1, vec![account(10, "1111", "150.00")]),
        );
        let overview = AccountOverview::new(Arc::clone(&api) as _, &session());
        overview.load().await.unwrap();

        api.fail_operation(MockOperation::GetAccounts);
        assert!(overview.refresh().await.is_err());

        assert_eq!(overview.accounts().len(), 1);
    }
}

//! Shared client state and component factories.

use std::sync::Arc;

use crate::domain::{AccountId, BankingApi, SessionStore};

use super::contacts::ContactDirectory;
use super::dashboard::AccountOverview;
use super::history::TransactionHistoryReconciler;
use super::session::{ActiveSession, SessionContext, UserSelection};
use super::transfer::TransferOrchestrator;

/// Backend and session store shared by every view
#[derive(Clone)]
pub struct ClientState {
    pub api: Arc<dyn BankingApi>,
    pub session_store: Arc<dyn SessionStore>,
}

impl ClientState {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, session_store: Arc<dyn SessionStore>) -> Self {
        Self { api, session_store }
    }

    #[must_use]
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(Arc::clone(&self.api), Arc::clone(&self.session_store))
    }

    #[must_use]
    pub fn user_selection(&self) -> UserSelection {
        UserSelection::new(Arc::clone(&self.api), Arc::clone(&self.session_store))
    }

    #[must_use]
    pub fn account_overview(&self, session: &ActiveSession) -> AccountOverview {
        AccountOverview::new(Arc::clone(&self.api), session)
    }

    #[must_use]
    pub fn contact_directory(&self, session: &ActiveSession) -> ContactDirectory {
        ContactDirectory::new(Arc::clone(&self.api), session)
    }

    #[must_use]
    pub fn transfer_orchestrator(&self) -> TransferOrchestrator {
        TransferOrchestrator::new(Arc::clone(&self.api))
    }

    #[must_use]
    pub fn history(&self, account_id: AccountId) -> TransactionHistoryReconciler {
        TransactionHistoryReconciler::new(Arc::clone(&self.api), account_id)
    }
}

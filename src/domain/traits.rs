//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::AppError;
use super::types::{Account, AccountId, Contact, SubmitTransferRequest, Transaction, User, UserId};

/// Logical banking backend consumed by every component.
///
/// The backend is authoritative for balances, commissions and the ledger;
/// implementations only move data and map transport failures into
/// [`AppError::ExternalService`].
#[async_trait]
pub trait BankingApi: Send + Sync {
    /// List every user that can be selected as the active user
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Fetch a single user by id
    async fn get_user(&self, user_id: UserId) -> Result<User, AppError>;

    /// Fetch the accounts owned by a user
    async fn get_accounts(&self, user_id: UserId) -> Result<Vec<Account>, AppError>;

    /// Fetch the contact directory visible to a user
    async fn get_contacts(&self, user_id: UserId) -> Result<Vec<Contact>, AppError>;

    /// Submit a transfer.
    ///
    /// A 2xx acknowledgement is success; the created transaction is returned
    /// when the backend echoes it.
    async fn submit_transfer(
        &self,
        request: &SubmitTransferRequest,
    ) -> Result<Option<Transaction>, AppError>;

    /// Transactions sent from an account
    async fn get_outgoing_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Transactions received by an account
    async fn get_incoming_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError>;
}

/// Persistence for the selected-user anchor.
///
/// Values are stored verbatim; interpreting them is the session's job.
pub trait SessionStore: Send + Sync {
    /// Read the persisted selection, `None` when nothing is selected
    fn load(&self) -> Result<Option<String>, AppError>;

    /// Persist a selection, replacing any previous one
    fn save(&self, value: &str) -> Result<(), AppError>;

    /// Remove the persisted selection; clearing an empty store is not an error
    fn clear(&self) -> Result<(), AppError>;
}

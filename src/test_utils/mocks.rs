//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{
    Account, AccountId, AppError, BankingApi, Contact, ExternalServiceError,
    SubmitTransferRequest, Transaction, User, UserId,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// Operations of [`BankingApi`], used to fail or count individual calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ListUsers,
    GetUser,
    GetAccounts,
    GetContacts,
    SubmitTransfer,
    GetOutgoing,
    GetIncoming,
}

#[derive(Default)]
struct MockData {
    users: Vec<User>,
    accounts: HashMap<UserId, Vec<Account>>,
    contacts: HashMap<UserId, Vec<Contact>>,
    outgoing: HashMap<AccountId, Vec<Transaction>>,
    incoming: HashMap<AccountId, Vec<Transaction>>,
}

/// In-memory banking backend for testing
pub struct MockBankingApi {
    data: Mutex<MockData>,
    config: MockConfig,
    failing_operations: Mutex<HashSet<MockOperation>>,
    latency: Option<Duration>,
    calls: Mutex<Vec<MockOperation>>,
    submitted: Mutex<Vec<SubmitTransferRequest>>,
    next_transaction_id: AtomicI64,
}

impl MockBankingApi {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            data: Mutex::new(MockData::default()),
            config,
            failing_operations: Mutex::new(HashSet::new()),
            latency: None,
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            next_transaction_id: AtomicI64::new(1000),
        }
    }

    /// Every operation fails with the given message
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Delay every call by `latency` before answering
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.data.lock().unwrap().users.push(user);
        self
    }

    #[must_use]
    pub fn with_accounts(self, user_id: UserId, accounts: Vec<Account>) -> Self {
        self.data.lock().unwrap().accounts.insert(user_id, accounts);
        self
    }

    #[must_use]
    pub fn with_contacts(self, user_id: UserId, contacts: Vec<Contact>) -> Self {
        self.data.lock().unwrap().contacts.insert(user_id, contacts);
        self
    }

    #[must_use]
    pub fn with_outgoing(self, account_id: AccountId, transactions: Vec<Transaction>) -> Self {
        self.data
            .lock()
            .unwrap()
            .outgoing
            .insert(account_id, transactions);
        self
    }

    #[must_use]
    pub fn with_incoming(self, account_id: AccountId, transactions: Vec<Transaction>) -> Self {
        self.data
            .lock()
            .unwrap()
            .incoming
            .insert(account_id, transactions);
        self
    }

    /// Make a single operation fail while the others keep working
    pub fn fail_operation(&self, operation: MockOperation) {
        self.failing_operations.lock().unwrap().insert(operation);
    }

    pub fn recover_operation(&self, operation: MockOperation) {
        self.failing_operations.lock().unwrap().remove(&operation);
    }

    /// Replace a user's accounts, e.g. to simulate a balance change
    pub fn set_accounts(&self, user_id: UserId, accounts: Vec<Account>) {
        self.data.lock().unwrap().accounts.insert(user_id, accounts);
    }

    /// Number of calls made to an operation
    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    /// Transfer commands received so far
    pub fn submitted_transfers(&self) -> Vec<SubmitTransferRequest> {
        self.submitted.lock().unwrap().clone()
    }

    async fn enter(&self, operation: MockOperation) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(operation);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let op_failing = self.failing_operations.lock().unwrap().contains(&operation);
        if self.config.should_fail || op_failing {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: 500,
                message: msg,
            }));
        }
        Ok(())
    }

    fn lookup_account(&self, account_id: AccountId) -> Account {
        let data = self.data.lock().unwrap();
        data.accounts
            .values()
            .flatten()
            .chain(data.contacts.values().flatten().map(|c| &c.linked_account))
            .find(|a| a.id == account_id)
            .cloned()
            .unwrap_or_else(|| Account::new(account_id, "", Decimal::ZERO))
    }
}

impl Default for MockBankingApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankingApi for MockBankingApi {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.enter(MockOperation::ListUsers).await?;
        Ok(self.data.lock().unwrap().users.clone())
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.enter(MockOperation::GetUser).await?;
        self.data
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| {
                AppError::ExternalService(ExternalServiceError::NotFound(format!(
                    "user {}",
                    user_id
                )))
            })
    }

    async fn get_accounts(&self, user_id: UserId) -> Result<Vec<Account>, AppError> {
        self.enter(MockOperation::GetAccounts).await?;
        let data = self.data.lock().unwrap();
        Ok(data.accounts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_contacts(&self, user_id: UserId) -> Result<Vec<Contact>, AppError> {
        self.enter(MockOperation::GetContacts).await?;
        let data = self.data.lock().unwrap();
        Ok(data.contacts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn submit_transfer(
        &self,
        request: &SubmitTransferRequest,
    ) -> Result<Option<Transaction>, AppError> {
        self.enter(MockOperation::SubmitTransfer).await?;
        self.submitted.lock().unwrap().push(request.clone());

        let transaction = Transaction {
            id: self.next_transaction_id.fetch_add(1, Ordering::Relaxed),
            amount: request.amount,
            timestamp: Utc::now(),
            source_account: self.lookup_account(request.source_account_id),
            destination_account: self.lookup_account(request.destination_account_id),
            commission: Vec::new(),
        };
        let mut data = self.data.lock().unwrap();
        data.outgoing
            .entry(request.source_account_id)
            .or_default()
            .push(transaction.clone());
        data.incoming
            .entry(request.destination_account_id)
            .or_default()
            .push(transaction.clone());
        Ok(Some(transaction))
    }

    async fn get_outgoing_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        self.enter(MockOperation::GetOutgoing).await?;
        let data = self.data.lock().unwrap();
        Ok(data.outgoing.get(&account_id).cloned().unwrap_or_default())
    }

    async fn get_incoming_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        self.enter(MockOperation::GetIncoming).await?;
        let data = self.data.lock().unwrap();
        Ok(data.incoming.get(&account_id).cloned().unwrap_or_default())
    }
}

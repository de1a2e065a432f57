//! Transaction history for one account, merged from both directions.

use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::domain::{AccountId, AppError, BankingApi, Direction, Transaction};

use super::scope::ViewScope;

/// `dd Mon yyyy, HH:MM`
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%d %b %Y, %H:%M";

/// A transaction as presented in one account's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub transaction: Transaction,
    pub direction: Direction,
    /// First commission entry, outgoing transactions only
    pub commission: Option<Decimal>,
}

impl HistoryEntry {
    fn classify(transaction: Transaction, account_id: AccountId) -> Self {
        let direction = if transaction.destination_account.id == account_id {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        let commission = match direction {
            Direction::Outgoing => transaction.commission.first().map(|c| c.amount),
            Direction::Incoming => None,
        };
        Self {
            transaction,
            direction,
            commission,
        }
    }

    /// The other side's account number: sender for incoming, recipient for outgoing
    pub fn counterpart_account_number(&self) -> &str {
        match self.direction {
            Direction::Incoming => &self.transaction.source_account.account_number,
            Direction::Outgoing => &self.transaction.destination_account.account_number,
        }
    }

    pub fn counterpart_label(&self) -> String {
        match self.direction {
            Direction::Incoming => format!("Received from: {}", self.counterpart_account_number()),
            Direction::Outgoing => format!("Sent to: {}", self.counterpart_account_number()),
        }
    }

    /// Amount with direction sign and two decimals, e.g. `-12.50`
    pub fn signed_amount(&self) -> String {
        let sign = match self.direction {
            Direction::Incoming => '+',
            Direction::Outgoing => '-',
        };
        format!("{}{:.2}", sign, self.transaction.amount.round_dp(2))
    }

    pub fn display_timestamp(&self) -> String {
        self.transaction
            .timestamp
            .format(DISPLAY_TIMESTAMP_FORMAT)
            .to_string()
    }
}

/// Merge both legs into one newest-first, classified list.
///
/// The sort is stable, so equal timestamps keep outgoing-then-incoming order.
#[must_use]
pub fn reconcile(
    account_id: AccountId,
    outgoing: Vec<Transaction>,
    incoming: Vec<Transaction>,
) -> Vec<HistoryEntry> {
    let mut merged: Vec<Transaction> = outgoing.into_iter().chain(incoming).collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged
        .into_iter()
        .map(|tx| HistoryEntry::classify(tx, account_id))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    /// Nothing requested yet
    Idle,
    Loading,
    /// Both legs arrived; may be empty
    Loaded(Vec<HistoryEntry>),
    /// Either leg failed; nothing is presented
    Failed(String),
}

/// Fetches and reconciles the history of one account
pub struct TransactionHistoryReconciler {
    api: Arc<dyn BankingApi>,
    account_id: AccountId,
    state: Mutex<HistoryState>,
    scope: ViewScope,
}

impl TransactionHistoryReconciler {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, account_id: AccountId) -> Self {
        Self {
            api,
            account_id,
            state: Mutex::new(HistoryState::Idle),
            scope: ViewScope::new(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Fetch outgoing and incoming transactions together and merge them once
    /// both have arrived.
    ///
    /// Either leg failing fails the whole load. Returns the number of entries.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn load(&self) -> Result<usize, AppError> {
        *self.lock_state() = HistoryState::Loading;

        let legs = self
            .scope
            .run(async {
                tokio::try_join!(
                    self.api.get_outgoing_transactions(self.account_id),
                    self.api.get_incoming_transactions(self.account_id),
                )
            })
            .await;

        match legs {
            Ok((outgoing, incoming)) => {
                debug!(
                    outgoing = outgoing.len(),
                    incoming = incoming.len(),
                    "Transaction history fetched"
                );
                let entries = reconcile(self.account_id, outgoing, incoming);
                let count = entries.len();
                *self.lock_state() = HistoryState::Loaded(entries);
                Ok(count)
            }
            Err(AppError::Cancelled) => {
                debug!("Transaction history fetch cancelled");
                Err(AppError::Cancelled)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Failed to load transaction history"
                );
                *self.lock_state() = HistoryState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> HistoryState {
        self.lock_state().clone()
    }

    /// Presented entries; empty unless the last load fully succeeded
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        match &*self.lock_state() {
            HistoryState::Loaded(entries) => entries.clone(),
            _ => Vec::new(),
        }
    }

    /// Cancel a load still in flight
    pub fn teardown(&self) {
        self.scope.close();
    }

    fn lock_state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TransactionHistoryReconciler {
    fn drop(&mut self) {
        self.scope.close();
    }
}

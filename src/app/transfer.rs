//! Transfer form state machine.
//!
//! ```text
//! Idle -> OpenUninitialized -> OpenReady <-> (edits) -> Submitting -> Closed
//!                                  ^                          |
//!                                  +-------- on failure ------+
//! ```
//!
//! The orchestrator only guards against obviously invalid input using the
//! source account's last-known balance. It never refreshes balances itself.

use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::domain::{
    Account, AccountId, AppError, BankingApi, Contact, ContactId, SubmitTransferRequest,
    Transaction, ValidationError,
};

use super::amount::{AmountReading, accepts_amount_input, read_amount_input};
use super::contacts::ContactDirectory;
use super::scope::ViewScope;
use super::session::ActiveSession;

/// Warning shown next to the amount when it exceeds the source balance
pub const BALANCE_EXCEEDED_WARNING: &str = "The amount exceeds your available balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Never opened
    Idle,
    /// Opened; destination candidates are still loading
    OpenUninitialized,
    /// Form is editable
    OpenReady,
    /// Transfer command is outstanding; every control is disabled
    Submitting,
    /// Cancelled or submitted successfully
    Closed,
}

impl TransferPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::OpenUninitialized => "open_uninitialized",
            Self::OpenReady => "open_ready",
            Self::Submitting => "submitting",
            Self::Closed => "closed",
        }
    }

    /// Whether the form accepts edits
    #[inline]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::OpenUninitialized | Self::OpenReady)
    }
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selectable destination, always identified by account id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCandidate {
    pub contact_id: ContactId,
    pub account_id: AccountId,
    pub label: String,
}

impl From<&Contact> for DestinationCandidate {
    fn from(contact: &Contact) -> Self {
        Self {
            contact_id: contact.id,
            account_id: contact.linked_account.id,
            label: format!(
                "{} - {}",
                contact.counterpart.name, contact.linked_account.account_number
            ),
        }
    }
}

/// Submit affordance state derived from the current form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitReadiness {
    pub can_submit: bool,
    pub exceeds_balance: bool,
}

impl SubmitReadiness {
    /// The only precondition failure that carries a message
    pub fn warning(&self) -> Option<&'static str> {
        self.exceeds_balance.then_some(BALANCE_EXCEEDED_WARNING)
    }
}

/// Transient form values; dropped on close and on successful submit
#[derive(Debug, Clone)]
struct TransferForm {
    source: Account,
    destination: Option<AccountId>,
    amount: String,
}

impl TransferForm {
    fn new(source: Account) -> Self {
        Self {
            source,
            destination: None,
            amount: String::new(),
        }
    }

    fn readiness(&self, phase: TransferPhase) -> SubmitReadiness {
        let reading = read_amount_input(&self.amount);
        // An amount too large to represent exceeds any balance
        let exceeds_balance = match reading {
            AmountReading::Value(amount) => amount > self.source.balance,
            AmountReading::TooLarge => true,
            AmountReading::Blank => false,
        };
        let can_submit = phase == TransferPhase::OpenReady
            && self.destination.is_some()
            && reading.value().is_some_and(|a| a > Decimal::ZERO)
            && !exceeds_balance;
        SubmitReadiness {
            can_submit,
            exceeds_balance,
        }
    }
}

#[derive(Debug)]
struct OrchestratorInner {
    phase: TransferPhase,
    form: Option<TransferForm>,
    candidates: Vec<DestinationCandidate>,
    /// Bumped on every open/close so a stale candidate fetch cannot land
    generation: u64,
}

/// Validates and submits a single transfer.
///
/// All methods take `&self`; share it behind an `Arc` between the view and
/// its event handlers.
pub struct TransferOrchestrator {
    api: Arc<dyn BankingApi>,
    inner: Mutex<OrchestratorInner>,
    scope: ViewScope,
}

impl TransferOrchestrator {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(OrchestratorInner {
                phase: TransferPhase::Idle,
                form: None,
                candidates: Vec::new(),
                generation: 0,
            }),
            scope: ViewScope::new(),
        }
    }

    /// Open the form for `source` and load destinations from the initiating
    /// user's contacts.
    ///
    /// A failed contact fetch still opens the form, with no candidates.
    #[instrument(skip(self, source, session), fields(source_account_id = %source.id, user_id = %session.user_id()))]
    pub async fn open(&self, source: Account, session: &ActiveSession) -> Result<(), AppError> {
        let generation = {
            let mut inner = self.lock_inner();
            if inner.phase == TransferPhase::Submitting {
                return Err(ValidationError::TransferInFlight.into());
            }
            inner.phase = TransferPhase::OpenUninitialized;
            inner.form = Some(TransferForm::new(source));
            inner.candidates.clear();
            inner.generation += 1;
            inner.generation
        };

        let directory =
            ContactDirectory::with_scope(Arc::clone(&self.api), session, self.scope.clone());
        match directory.load().await {
            Ok(_) => {}
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => warn!(error = %e, "Destination candidates unavailable"),
        }
        let candidates: Vec<DestinationCandidate> =
            directory.contacts().iter().map(DestinationCandidate::from).collect();

        let mut inner = self.lock_inner();
        if inner.generation == generation && inner.phase == TransferPhase::OpenUninitialized {
            debug!(count = candidates.len(), "Transfer form ready");
            inner.candidates = candidates;
            inner.phase = TransferPhase::OpenReady;
        }
        Ok(())
    }

    /// Offer a new amount string; returns whether it was stored.
    ///
    /// Input outside the mask, or any edit while the form is not editable,
    /// leaves the stored value untouched.
    pub fn edit_amount(&self, input: &str) -> bool {
        let mut inner = self.lock_inner();
        if !inner.phase.is_editable() || !accepts_amount_input(input) {
            return false;
        }
        match inner.form.as_mut() {
            Some(form) => {
                form.amount = input.to_string();
                true
            }
            None => false,
        }
    }

    /// Choose a destination from the candidate list, or clear it with `None`
    pub fn select_destination(&self, account_id: Option<AccountId>) -> Result<(), AppError> {
        let mut inner = self.lock_inner();
        match inner.phase {
            TransferPhase::Submitting => return Err(ValidationError::TransferInFlight.into()),
            TransferPhase::OpenReady => {}
            _ => return Err(ValidationError::NotReady.into()),
        }
        if let Some(id) = account_id {
            if !inner.candidates.iter().any(|c| c.account_id == id) {
                return Err(ValidationError::InvalidField {
                    field: "destination".to_string(),
                    message: format!("account {} is not one of your contacts", id),
                }
                .into());
            }
        }
        if let Some(form) = inner.form.as_mut() {
            form.destination = account_id;
        }
        Ok(())
    }

    /// Issue the transfer command.
    ///
    /// Exactly one command per call. Success closes the form; failure returns
    /// it to `OpenReady` with every value intact and hands the error back.
    /// Once issued the command is not cancelled by teardown. Dropping the
    /// returned future mid-flight also returns the form to `OpenReady`.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Option<Transaction>, AppError> {
        let request = {
            let mut inner = self.lock_inner();
            match inner.phase {
                TransferPhase::Submitting => {
                    return Err(ValidationError::TransferInFlight.into());
                }
                TransferPhase::OpenReady => {}
                _ => return Err(ValidationError::NotReady.into()),
            }
            let Some(form) = inner.form.as_ref() else {
                return Err(ValidationError::NotReady.into());
            };
            let Some(destination) = form.destination else {
                return Err(ValidationError::MissingField("destination".to_string()).into());
            };
            let Some(amount) = read_amount_input(&form.amount).value() else {
                return Err(ValidationError::MissingField("amount".to_string()).into());
            };
            if !form.readiness(inner.phase).can_submit {
                return Err(ValidationError::NotReady.into());
            }
            let request = SubmitTransferRequest::new(form.source.id, destination, amount);
            request.validate().map_err(|e| {
                warn!(error = %e, "Transfer request failed validation");
                AppError::Validation(ValidationError::Multiple(e.to_string()))
            })?;
            inner.phase = TransferPhase::Submitting;
            request
        };

        info!(
            source_account_id = %request.source_account_id,
            destination_account_id = %request.destination_account_id,
            amount = %request.amount,
            "Submitting transfer"
        );
        let mut guard = SubmitGuard::new(self);
        let result = self.api.submit_transfer(&request).await;
        guard.disarm();

        let mut inner = self.lock_inner();
        match result {
            Ok(transaction) => {
                info!(
                    transaction_id = ?transaction.as_ref().map(|tx| tx.id),
                    "Transfer accepted"
                );
                inner.phase = TransferPhase::Closed;
                inner.form = None;
                inner.candidates.clear();
                Ok(transaction)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Transfer failed, form kept for editing"
                );
                inner.phase = TransferPhase::OpenReady;
                Err(e)
            }
        }
    }

    /// Cancel the form. Ignored while submitting or when not open.
    pub fn close(&self) -> bool {
        let mut inner = self.lock_inner();
        if !inner.phase.is_editable() {
            return false;
        }
        inner.phase = TransferPhase::Closed;
        inner.form = None;
        inner.candidates.clear();
        inner.generation += 1;
        debug!("Transfer form closed");
        true
    }

    #[must_use]
    pub fn phase(&self) -> TransferPhase {
        self.lock_inner().phase
    }

    /// Whether inputs and buttons should accept interaction
    #[must_use]
    pub fn controls_enabled(&self) -> bool {
        self.phase().is_editable()
    }

    #[must_use]
    pub fn readiness(&self) -> SubmitReadiness {
        let inner = self.lock_inner();
        inner
            .form
            .as_ref()
            .map(|form| form.readiness(inner.phase))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn amount(&self) -> String {
        self.lock_inner()
            .form
            .as_ref()
            .map(|f| f.amount.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn destination(&self) -> Option<AccountId> {
        self.lock_inner().form.as_ref().and_then(|f| f.destination)
    }

    #[must_use]
    pub fn source(&self) -> Option<Account> {
        self.lock_inner().form.as_ref().map(|f| f.source.clone())
    }

    #[must_use]
    pub fn candidates(&self) -> Vec<DestinationCandidate> {
        self.lock_inner().candidates.clone()
    }

    /// Cancel a candidate fetch still in flight
    pub fn teardown(&self) {
        self.scope.close();
    }

    fn lock_inner(&self) -> MutexGuard<'_, OrchestratorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TransferOrchestrator {
    fn drop(&mut self) {
        self.scope.close();
    }
}

/// Returns the form to `OpenReady` if a submit future is dropped while the
/// command is outstanding. The outcome is unknown, so the values are kept.
struct SubmitGuard<'a> {
    orchestrator: &'a TransferOrchestrator,
    armed: bool,
}

impl<'a> SubmitGuard<'a> {
    fn new(orchestrator: &'a TransferOrchestrator) -> Self {
        Self {
            orchestrator,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.orchestrator.lock_inner();
        if inner.phase == TransferPhase::Submitting {
            warn!("Transfer submission abandoned before a reply, form kept for editing");
            inner.phase = TransferPhase::OpenReady;
        }
    }
}

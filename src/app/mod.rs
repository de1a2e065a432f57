//! Application layer: session resolution and the per-view components.

pub mod amount;
pub mod contacts;
pub mod dashboard;
pub mod history;
pub mod scope;
pub mod session;
pub mod state;
pub mod transfer;

pub use amount::{AmountReading, accepts_amount_input, parse_amount_input, read_amount_input};
pub use contacts::{ContactDirectory, ContactEntry, DirectoryView, mask_account_number};
pub use dashboard::{AccountOverview, OverviewState};
pub use history::{HistoryEntry, HistoryState, TransactionHistoryReconciler, reconcile};
pub use scope::ViewScope;
pub use session::{ActiveSession, SessionContext, SessionSnapshot, UserSelection};
pub use state::ClientState;
pub use transfer::{
    BALANCE_EXCEEDED_WARNING, DestinationCandidate, SubmitReadiness, TransferOrchestrator,
    TransferPhase,
};

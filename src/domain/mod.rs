//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AppError, ConfigError, ExternalServiceError, SessionError, ValidationError,
};
pub use traits::{BankingApi, SessionStore};
pub use types::{
    AMOUNT_MAX_SCALE, Account, AccountId, Commission, Contact, ContactId, Counterpart, Direction,
    SubmitTransferRequest, Transaction, TransactionId, User, UserId, parse_timestamp,
};

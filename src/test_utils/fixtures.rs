//! Builders for domain values used across tests.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::{Account, AccountId, Commission, Contact, ContactId, Counterpart, Transaction, User, UserId};

/// Parse a decimal literal, panicking on malformed test input
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn user(id: UserId, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        image_url: None,
    }
}

pub fn account(id: AccountId, number: &str, balance: &str) -> Account {
    Account::new(id, number, dec(balance))
}

pub fn contact(id: ContactId, name: &str, linked_account: Account) -> Contact {
    Contact::new(
        id,
        Counterpart {
            id: 100 + id,
            name: name.to_string(),
        },
        linked_account,
    )
}

/// Minute `minute` of 2024-05-01 10:00 UTC, for ordering tests
pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
}

pub fn transaction(
    id: i64,
    source: AccountId,
    destination: AccountId,
    amount: &str,
    timestamp: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id,
        amount: dec(amount),
        timestamp,
        source_account: Account::new(source, format!("{:016}", source), Decimal::ZERO),
        destination_account: Account::new(destination, format!("{:016}", destination), Decimal::ZERO),
        commission: Vec::new(),
    }
}

/// Attach commission entries to a transaction
pub fn with_commission(mut tx: Transaction, amounts: &[&str]) -> Transaction {
    tx.commission = amounts
        .iter()
        .map(|a| Commission {
            amount: dec(a),
            timestamp: tx.timestamp,
        })
        .collect();
    tx
}

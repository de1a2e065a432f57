//! Domain types with validation support.
//!
//! Field names on the wire follow the banking backend's JSON contract; the
//! Rust-side names describe what the values are.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

pub type UserId = i64;
pub type AccountId = i64;
pub type ContactId = i64;
pub type TransactionId = i64;

/// A selectable end user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "correo", default)]
    pub email: String,
    #[serde(rename = "imagenUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Balance-bearing account identified by a human-readable number.
///
/// `balance` is the last snapshot the backend returned and is only used to
/// guard obviously invalid input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "numero_cuenta", default)]
    pub account_number: String,
    #[serde(rename = "saldo", default)]
    pub balance: Decimal,
}

impl Account {
    #[must_use]
    pub fn new(id: AccountId, account_number: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            account_number: account_number.into(),
            balance,
        }
    }
}

/// The user on the other side of a contact entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counterpart {
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// Directory entry binding a counterpart user to one of their accounts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    #[serde(rename = "contacto")]
    pub counterpart: Counterpart,
    #[serde(rename = "cuenta")]
    pub linked_account: Account,
}

impl Contact {
    #[must_use]
    pub fn new(id: ContactId, counterpart: Counterpart, linked_account: Account) -> Self {
        Self {
            id,
            counterpart,
            linked_account,
        }
    }
}

/// Fee charged to the sending side of a settled transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commission {
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fechaHora", with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Settled, immutable record of a completed transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fechaHora", with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "cuentaOrigen")]
    pub source_account: Account,
    #[serde(rename = "cuentaDestino")]
    pub destination_account: Account,
    #[serde(rename = "comision", default, deserialize_with = "null_as_empty")]
    pub commission: Vec<Commission>,
}

/// Outbound transfer command.
///
/// Built by the transfer form at submit time and discarded afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct SubmitTransferRequest {
    #[serde(rename = "idCuentaOrigen")]
    pub source_account_id: AccountId,
    #[serde(rename = "idCuentaDestino")]
    pub destination_account_id: AccountId,
    #[validate(custom(function = "validate_transfer_amount"))]
    #[serde(rename = "monto", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl SubmitTransferRequest {
    #[must_use]
    pub fn new(source_account_id: AccountId, destination_account_id: AccountId, amount: Decimal) -> Self {
        Self {
            source_account_id,
            destination_account_id,
            amount,
        }
    }
}

/// Maximum fractional digits a transfer amount may carry
pub const AMOUNT_MAX_SCALE: u32 = 2;

fn validate_transfer_amount(amount: &Decimal) -> Result<(), validator::ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        let mut err = validator::ValidationError::new("amount_not_positive");
        err.message = Some("Amount must be greater than 0".into());
        return Err(err);
    }
    if amount.normalize().scale() > AMOUNT_MAX_SCALE {
        let mut err = validator::ValidationError::new("amount_precision");
        err.message = Some("Amount may have at most 2 decimal places".into());
        return Err(err);
    }
    Ok(())
}

/// Direction of a transaction relative to the account whose history is shown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Funds arrived at the queried account
    Incoming,
    /// Funds left the queried account
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive local date-time which is taken
/// as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("Unrecognised timestamp: {}", raw))
}

mod flexible_timestamp {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(D::Error::custom)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_direction_display_and_parsing() {
        for (direction, string) in [
            (Direction::Incoming, "incoming"),
            (Direction::Outgoing, "outgoing"),
        ] {
            assert_eq!(direction.as_str(), string);
            assert_eq!(direction.to_string(), string);
            assert_eq!(Direction::from_str(string).unwrap(), direction);
        }

        assert!(Direction::from_str("sideways").is_err());
    }

    #[test]
    fn test_submit_transfer_request_validation() {
        let req = SubmitTransferRequest::new(1, 2, dec("50.00"));
        assert!(req.validate().is_ok());

        let req = SubmitTransferRequest::new(1, 2, dec("0.01"));
        assert!(req.validate().is_ok());

        // Zero
        let req = SubmitTransferRequest::new(1, 2, Decimal::ZERO);
        assert!(req.validate().is_err());

        // Negative
        let req = SubmitTransferRequest::new(1, 2, dec("-5"));
        assert!(req.validate().is_err());

        // Too many fractional digits
        let req = SubmitTransferRequest::new(1, 2, dec("1.005"));
        assert!(req.validate().is_err());

        // Trailing zeros do not count as precision
        let req = SubmitTransferRequest::new(1, 2, dec("1.500"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_submit_transfer_request_wire_format() {
        let req = SubmitTransferRequest::new(7, 9, dec("125.50"));
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["idCuentaOrigen"], 7);
        assert_eq!(json["idCuentaDestino"], 9);
        assert_eq!(json["monto"].as_f64().unwrap(), 125.5);
    }

    #[test]
    fn test_transaction_deserializes_backend_payload() {
        let json = r#"{
            "id": 41,
            "monto": 120.5,
            "fechaHora": "2024-05-01T10:20:30",
            "cuentaOrigen": { "id": 1, "numero_cuenta": "1111222233334444", "saldo": 900 },
            "cuentaDestino": { "id": 2, "numero_cuenta": "5555666677778888", "saldo": 10.25 },
            "comision": [ { "monto": 1.2, "fechaHora": "2024-05-01T10:20:31.123" } ]
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, 41);
        assert_eq!(tx.amount, dec("120.5"));
        assert_eq!(
            tx.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap()
        );
        assert_eq!(tx.source_account.account_number, "1111222233334444");
        assert_eq!(tx.destination_account.balance, dec("10.25"));
        assert_eq!(tx.commission.len(), 1);
        assert_eq!(tx.commission[0].amount, dec("1.2"));
    }

    #[test]
    fn test_transaction_null_or_missing_commission_is_empty() {
        let with_null = r#"{
            "id": 1, "monto": 5, "fechaHora": "2024-05-01T10:20:30Z",
            "cuentaOrigen": { "id": 1 }, "cuentaDestino": { "id": 2 },
            "comision": null
        }"#;
        let tx: Transaction = serde_json::from_str(with_null).unwrap();
        assert!(tx.commission.is_empty());
        assert_eq!(tx.source_account.account_number, "");
        assert_eq!(tx.source_account.balance, Decimal::ZERO);

        let missing = r#"{
            "id": 1, "monto": "5.00", "fechaHora": "2024-05-01T10:20:30+02:00",
            "cuentaOrigen": { "id": 1 }, "cuentaDestino": { "id": 2 }
        }"#;
        let tx: Transaction = serde_json::from_str(missing).unwrap();
        assert!(tx.commission.is_empty());
        assert_eq!(
            tx.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 20, 30).unwrap()
        );
    }

    #[test]
    fn test_contact_deserializes_backend_payload() {
        let json = r#"{
            "id": 3,
            "contacto": { "id": 12, "nombre": "Ana Maria" },
            "cuenta": { "id": 30, "numero_cuenta": "1234567890123456" }
        }"#;
        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.counterpart.name, "Ana Maria");
        assert_eq!(contact.linked_account.id, 30);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-05-01 10:20:30").is_ok());
    }
}

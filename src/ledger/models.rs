//! Ledger domain models
//!
//! Types and statuses are stored as lowercase text; the enums here are the
//! single source of truth for the legal values.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Bet placement: reserves funds on the wallet side
    Withdraw,
    /// Bet settlement: pays out (or zero-settles) a placement
    Deposit,
    /// Cancels a still-pending placement, crediting the user back
    Cancel,
    /// Compensating action issued against a failed origin
    Revert,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Withdraw => "withdraw",
            TransactionType::Deposit => "deposit",
            TransactionType::Cancel => "cancel",
            TransactionType::Revert => "revert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "withdraw" => Some(TransactionType::Withdraw),
            "deposit" => Some(TransactionType::Deposit),
            "cancel" => Some(TransactionType::Cancel),
            "revert" => Some(TransactionType::Revert),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction lifecycle status
///
/// `syncing` and `pending` are transient; `completed`, `failed` and
/// `cancelled` are terminal. The only backwards transition is the explicit
/// `failed -> pending` rebound used by cancel-failure compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Intent persisted locally, wallet call not yet resolved
    Syncing,
    /// Placement synced with the wallet, awaiting settlement or cancel
    Pending,
    /// Terminal: settled
    Completed,
    /// Terminal: wallet or bookkeeping failure
    Failed,
    /// Terminal: placement cancelled
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Syncing => "syncing",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "syncing" => Some(TransactionStatus::Syncing),
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal status (no more transitions expected)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A player known to the broker
///
/// The broker never stores an authoritative balance; the wallet service is
/// the source of truth and is queried when a balance is needed.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Hex-encoded SHA-256 of the password
    pub password: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ledger transaction row
///
/// `provider_withdrawn_tx_id` links a settlement/cancel/revert to its
/// originating withdraw, forming a tree (withdraw -> child). Stored as a
/// nullable self-FK and hydrated by explicit lookup, never as an embedded
/// pointer graph.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    #[schema(value_type = f64, example = 10.00)]
    pub amount: Decimal,
    pub currency: String,
    pub provider_tx_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_withdrawn_tx_id: Option<i64>,
    #[schema(value_type = f64)]
    pub old_balance: Decimal,
    #[schema(value_type = f64)]
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outbox event status values (stored uppercase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Processed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Processed => "PROCESSED",
            EventStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(EventStatus::Pending),
            "PROCESSED" => Some(EventStatus::Processed),
            "FAILED" => Some(EventStatus::Failed),
            _ => None,
        }
    }
}

/// Durable compensation event, produced transactionally with ledger writes
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub status: EventStatus,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// The only event type emitted today
pub const EVENT_TYPE_WITHDRAW_REVERT: &str = "WITHDRAW_REVERT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_roundtrip() {
        for t in [
            TransactionType::Withdraw,
            TransactionType::Deposit,
            TransactionType::Cancel,
            TransactionType::Revert,
        ] {
            assert_eq!(TransactionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(TransactionType::from_str("transfer"), None);
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            TransactionStatus::Syncing,
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Cancelled,
        ] {
            assert_eq!(TransactionStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(TransactionStatus::from_str("done"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());

        assert!(!TransactionStatus::Syncing.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }

    #[test]
    fn test_event_status_roundtrip() {
        for s in [
            EventStatus::Pending,
            EventStatus::Processed,
            EventStatus::Failed,
        ] {
            assert_eq!(EventStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(EventStatus::from_str("pending"), None);
    }

    #[test]
    fn test_transaction_serializes_with_api_field_names() {
        let tx = Transaction {
            id: 7,
            user_id: 34633089486,
            tx_type: TransactionType::Withdraw,
            status: TransactionStatus::Pending,
            amount: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            provider_tx_id: "tx1".to_string(),
            provider_withdrawn_tx_id: None,
            old_balance: Decimal::new(10000, 2),
            new_balance: Decimal::new(9000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transaction_id"], 7);
        assert_eq!(json["type"], "withdraw");
        assert_eq!(json["status"], "pending");
        // Absent link is omitted entirely, not null
        assert!(json.get("provider_withdrawn_tx_id").is_none());
    }
}

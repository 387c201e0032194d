//! Wallet wire protocol types
//!
//! Requests use the remote's camelCase field names. Balance values travel as
//! decimal strings to preserve the remote's precision; callers parse them
//! with `Decimal::from_str`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One movement inside a wallet request batch
///
/// The coordinator always sends a single-item batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRequestTransaction {
    pub amount: Decimal,
    #[serde(rename = "betId")]
    pub bet_id: i64,
    pub reference: String,
}

/// Deposit/withdraw request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransactionRequest {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub currency: String,
    pub transactions: Vec<WalletRequestTransaction>,
}

impl WalletTransactionRequest {
    /// Build the single-item batch the coordinator always sends
    pub fn single(
        user_id: i64,
        currency: &str,
        amount: Decimal,
        bet_id: i64,
        reference: &str,
    ) -> Self {
        Self {
            user_id,
            currency: currency.to_string(),
            transactions: vec![WalletRequestTransaction {
                amount,
                bet_id,
                reference: reference.to_string(),
            }],
        }
    }
}

/// Response from the balance endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResponse {
    pub balance: String,
    pub currency: String,
}

/// One applied movement in an operation response
#[derive(Debug, Clone, Deserialize)]
pub struct WalletResponseTransaction {
    pub id: i64,
    pub reference: String,
}

/// Response from the deposit/withdraw endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransactionResponse {
    pub balance: String,
    #[serde(default)]
    pub transactions: Vec<WalletResponseTransaction>,
}

/// Error body the wallet sends alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct WalletErrorBody {
    pub code: String,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_remote_field_names() {
        let req = WalletTransactionRequest::single(
            34633089486,
            "USD",
            Decimal::new(1000, 2),
            42,
            "tx1",
        );
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["userId"], 34633089486i64);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["transactions"][0]["betId"], 42);
        assert_eq!(json["transactions"][0]["reference"], "tx1");
        // serde-float: amounts go out as JSON numbers
        assert_eq!(json["transactions"][0]["amount"], 10.0);
    }

    #[test]
    fn test_balance_stays_a_string() {
        let resp: WalletBalanceResponse =
            serde_json::from_str(r#"{"balance":"90.00","currency":"USD"}"#).unwrap();
        assert_eq!(resp.balance, "90.00");
    }

    #[test]
    fn test_transaction_response_without_transactions_field() {
        let resp: WalletTransactionResponse =
            serde_json::from_str(r#"{"balance":"110.00"}"#).unwrap();
        assert!(resp.transactions.is_empty());
    }
}

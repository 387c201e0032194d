//! Shared coordinator helpers: input validation, user and transaction
//! checks, balance parsing.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgExecutor;

use crate::error::AppError;
use crate::ledger::{Transaction, TransactionStatus, User, UserRepo};

/// Longest provider transaction id accepted from callers. The reserved
/// `cancel_` / `revert_` derivations are minted internally on top of this.
pub(crate) const MAX_PROVIDER_TX_ID_LEN: usize = 64;

/// Validate a monetary amount: non-negative (strictly positive unless
/// zero-settlement is allowed) with at most two fractional digits.
pub(crate) fn validate_amount(amount: Decimal, allow_zero: bool) -> Result<(), AppError> {
    if amount < Decimal::ZERO {
        return Err(AppError::InvalidAmount);
    }
    if amount == Decimal::ZERO && !allow_zero {
        return Err(AppError::InvalidAmount);
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::InvalidPrecision);
    }
    Ok(())
}

/// Validate a caller-supplied provider transaction id
pub(crate) fn validate_provider_tx_id(provider_tx_id: &str) -> Result<(), AppError> {
    if provider_tx_id.is_empty() {
        return Err(AppError::RequiredField("provider_tx_id"));
    }
    if provider_tx_id.len() > MAX_PROVIDER_TX_ID_LEN {
        return Err(AppError::InvalidFormat(
            "provider_tx_id exceeds 64 characters".to_string(),
        ));
    }
    Ok(())
}

/// Fetch a user and check the operation currency matches theirs
pub(crate) async fn get_user_and_validate(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    currency: &str,
) -> Result<User, AppError> {
    let user = UserRepo::get(executor, user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if user.currency != currency {
        return Err(AppError::InvalidCurrency);
    }

    Ok(user)
}

/// Fetch a user without a currency check (cancel / revert paths)
pub(crate) async fn get_user(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<User, AppError> {
    UserRepo::get(executor, user_id)
        .await?
        .ok_or(AppError::UserNotFound)
}

/// Check that a transaction belongs to the user
pub(crate) fn validate_ownership(tx: &Transaction, user_id: i64) -> Result<(), AppError> {
    if tx.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Check that a transaction is in the prerequisite status for an operation
pub(crate) fn validate_status(
    tx: &Transaction,
    expected: TransactionStatus,
    operation: &str,
) -> Result<(), AppError> {
    if tx.status != expected {
        return Err(AppError::TransactionInvalidStatus(operation.to_string()));
    }
    Ok(())
}

/// Parse a wallet balance string.
///
/// Balances travel as decimal strings to preserve the remote's precision;
/// a malformed string counts as a client error for local bookkeeping.
pub fn parse_balance(s: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(s)
        .map_err(|_| AppError::InvalidFormat(format!("invalid balance from wallet: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_validate_amount_boundaries() {
        // 0.01 accepted
        assert!(validate_amount(Decimal::new(1, 2), false).is_ok());
        // 0 rejected when zero not allowed
        assert!(matches!(
            validate_amount(Decimal::ZERO, false),
            Err(AppError::InvalidAmount)
        ));
        // 0 accepted for zero-settlement
        assert!(validate_amount(Decimal::ZERO, true).is_ok());
        // negative always rejected
        assert!(matches!(
            validate_amount(Decimal::new(-100, 2), true),
            Err(AppError::InvalidAmount)
        ));
        // 0.005 rejected on precision
        assert!(matches!(
            validate_amount(Decimal::new(5, 3), false),
            Err(AppError::InvalidPrecision)
        ));
        // trailing zeros beyond two places are fine: 10.00 == 10.0000
        assert!(validate_amount(Decimal::from_str("10.0000").unwrap(), false).is_ok());
    }

    #[test]
    fn test_validate_provider_tx_id() {
        assert!(validate_provider_tx_id("tx1").is_ok());
        assert!(matches!(
            validate_provider_tx_id(""),
            Err(AppError::RequiredField("provider_tx_id"))
        ));

        let id_64 = "a".repeat(64);
        assert!(validate_provider_tx_id(&id_64).is_ok());

        let id_65 = "a".repeat(65);
        assert!(matches!(
            validate_provider_tx_id(&id_65),
            Err(AppError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance("90.00").unwrap(), Decimal::new(9000, 2));
        assert_eq!(parse_balance("0").unwrap(), Decimal::ZERO);
        assert!(matches!(
            parse_balance("ninety"),
            Err(AppError::InvalidFormat(_))
        ));
        assert!(matches!(parse_balance(""), Err(AppError::InvalidFormat(_))));
    }

    fn fixture_tx(user_id: i64, status: TransactionStatus) -> Transaction {
        Transaction {
            id: 1,
            user_id,
            tx_type: crate::ledger::TransactionType::Withdraw,
            status,
            amount: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            provider_tx_id: "tx1".to_string(),
            provider_withdrawn_tx_id: None,
            old_balance: Decimal::ZERO,
            new_balance: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_ownership() {
        let tx = fixture_tx(5, TransactionStatus::Pending);
        assert!(validate_ownership(&tx, 5).is_ok());
        assert!(matches!(
            validate_ownership(&tx, 6),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_validate_status() {
        let tx = fixture_tx(5, TransactionStatus::Pending);
        assert!(validate_status(&tx, TransactionStatus::Pending, "cancelled").is_ok());

        let err = validate_status(&tx, TransactionStatus::Failed, "reverted").unwrap_err();
        assert!(matches!(err, AppError::TransactionInvalidStatus(_)));
        assert_eq!(err.to_string(), "Transaction cannot be reverted");
    }
}

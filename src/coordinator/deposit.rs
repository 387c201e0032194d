//! Deposit (bet settlement)
//!
//! Settles a pending withdraw. A zero amount is a valid settlement (the bet
//! was lost); the record is still created for audit. Settlement failure
//! leaves the withdraw `pending` for future cancellation or manual
//! reconciliation, deliberately without outbox compensation.

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::TransactionCoordinator;
use super::common::{
    get_user_and_validate, parse_balance, validate_amount, validate_ownership,
    validate_provider_tx_id, validate_status,
};
use crate::error::AppError;
use crate::ledger::transactions::NewTransaction;
use crate::ledger::{Transaction, TransactionRepo, TransactionStatus, TransactionType};
use crate::wallet::WalletTransactionRequest;

/// Bet settlement input
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub user_id: i64,
    pub amount: Decimal,
    pub provider_tx_id: String,
    pub provider_withdrawn_tx_id: i64,
    pub currency: String,
}

impl TransactionCoordinator {
    pub(super) async fn deposit_impl(&self, req: DepositRequest) -> Result<Transaction, AppError> {
        validate_amount(req.amount, true)?;
        validate_provider_tx_id(&req.provider_tx_id)?;
        if req.provider_withdrawn_tx_id <= 0 {
            return Err(AppError::InvalidFormat(
                "provider_withdrawn_tx_id must be positive".to_string(),
            ));
        }

        let _guard = self.locks.lock(req.user_id, None).await?;

        // === Phase A: persist the intent ===
        let mut db_tx = self.pool.begin().await?;

        get_user_and_validate(&mut *db_tx, req.user_id, &req.currency).await?;

        if TransactionRepo::get_by_provider_tx_id_for_update(&mut *db_tx, &req.provider_tx_id)
            .await?
            .is_some()
        {
            return Err(AppError::TransactionAlreadyExists);
        }

        let mut withdrawn_tx =
            TransactionRepo::get_by_id_for_update(&mut *db_tx, req.provider_withdrawn_tx_id)
                .await?
                .ok_or(AppError::TransactionNotFound)?;

        validate_ownership(&withdrawn_tx, req.user_id)?;

        if withdrawn_tx.status == TransactionStatus::Completed {
            return Err(AppError::TransactionAlreadyDeposited);
        }
        validate_status(&withdrawn_tx, TransactionStatus::Pending, "deposited")?;

        let mut transaction = TransactionRepo::create(
            &mut *db_tx,
            &NewTransaction {
                user_id: req.user_id,
                tx_type: TransactionType::Deposit,
                status: TransactionStatus::Syncing,
                amount: req.amount,
                currency: req.currency.clone(),
                provider_tx_id: req.provider_tx_id.clone(),
                provider_withdrawn_tx_id: Some(withdrawn_tx.id),
                old_balance: Decimal::ZERO,
                new_balance: Decimal::ZERO,
            },
        )
        .await?;

        db_tx.commit().await?;

        info!(
            user_id = req.user_id,
            transaction_id = transaction.id,
            withdrawn_tx_id = withdrawn_tx.id,
            provider_tx_id = %req.provider_tx_id,
            "Deposit intent persisted"
        );

        // === Phase B: call the wallet and record the outcome ===
        let wallet_req = WalletTransactionRequest::single(
            req.user_id,
            &req.currency,
            req.amount,
            withdrawn_tx.id,
            &req.provider_tx_id,
        );

        match self.wallet.deposit(wallet_req).await {
            Ok(resp) => {
                let new_balance = match parse_balance(&resp.balance) {
                    Ok(b) => b,
                    Err(parse_err) => {
                        return self.fail_deposit(&mut transaction, parse_err).await;
                    }
                };

                self.complete_deposit(&mut transaction, &mut withdrawn_tx, new_balance)
                    .await?;

                info!(
                    transaction_id = transaction.id,
                    new_balance = %new_balance,
                    "Deposit settled"
                );
                Ok(transaction)
            }
            Err(wallet_err) if wallet_err.is_conflict() => {
                // Remote already applied the settlement: reconcile from the
                // observed balance and complete both rows.
                info!(
                    transaction_id = transaction.id,
                    "Deposit conflict: treating as already applied"
                );

                let balance =
                    parse_balance(&self.wallet.get_balance(req.user_id).await?.balance)?;
                self.complete_deposit(&mut transaction, &mut withdrawn_tx, balance)
                    .await?;

                Ok(transaction)
            }
            Err(wallet_err) if wallet_err.is_client_error() => {
                warn!(
                    transaction_id = transaction.id,
                    error = %wallet_err,
                    "Wallet rejected deposit"
                );
                self.fail_deposit(&mut transaction, wallet_err.into()).await
            }
            Err(wallet_err) => {
                // Server error: the withdraw stays pending; no outbox
                // compensation for settlements.
                error!(
                    transaction_id = transaction.id,
                    error = %wallet_err,
                    "Wallet server error on deposit"
                );
                self.fail_deposit(&mut transaction, wallet_err.into()).await
            }
        }
    }

    /// Complete the deposit and its originating withdraw in one transaction
    async fn complete_deposit(
        &self,
        transaction: &mut Transaction,
        withdrawn_tx: &mut Transaction,
        balance: Decimal,
    ) -> Result<(), AppError> {
        transaction.status = TransactionStatus::Completed;
        transaction.new_balance = balance;
        transaction.old_balance = balance - transaction.amount;

        withdrawn_tx.status = TransactionStatus::Completed;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, transaction).await?;
        TransactionRepo::update_status(&mut *db_tx, withdrawn_tx.id, TransactionStatus::Completed)
            .await?;
        db_tx.commit().await?;

        Ok(())
    }

    /// Mark the deposit failed and surface the given error
    async fn fail_deposit(
        &self,
        transaction: &mut Transaction,
        err: AppError,
    ) -> Result<Transaction, AppError> {
        transaction.status = TransactionStatus::Failed;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, transaction).await?;
        db_tx.commit().await?;

        Err(err)
    }
}

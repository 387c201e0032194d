//! Cancel (bet cancellation)
//!
//! Cancels a still-pending withdraw by depositing the original amount back.
//! On wallet failure the cancel row fails and the withdraw rebounds
//! `cancelled -> pending` so the cancel may be retried.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::TransactionCoordinator;
use super::common::{
    get_user, parse_balance, validate_ownership, validate_provider_tx_id, validate_status,
};
use crate::error::AppError;
use crate::ledger::transactions::NewTransaction;
use crate::ledger::{Transaction, TransactionRepo, TransactionStatus, TransactionType};
use crate::wallet::WalletTransactionRequest;

impl TransactionCoordinator {
    pub(super) async fn cancel_impl(
        &self,
        user_id: i64,
        provider_tx_id: &str,
    ) -> Result<Transaction, AppError> {
        validate_provider_tx_id(provider_tx_id)?;

        let _guard = self.locks.lock(user_id, None).await?;

        // === Phase A: persist the cancel intent, park the withdraw ===
        let mut db_tx = self.pool.begin().await?;

        get_user(&mut *db_tx, user_id).await?;

        let original_tx =
            TransactionRepo::get_by_provider_tx_id_for_update(&mut *db_tx, provider_tx_id)
                .await?
                .ok_or(AppError::TransactionNotFound)?;

        validate_ownership(&original_tx, user_id)?;
        validate_status(&original_tx, TransactionStatus::Pending, "cancelled")?;

        // A withdraw has at most one cancel. A failed cancel left behind by
        // a rebound is reused so the retry can run under the same reserved
        // id; anything else is a duplicate.
        let cancel_provider_tx_id = format!("cancel_{}", original_tx.provider_tx_id);
        let mut cancel_tx = match TransactionRepo::get_by_provider_tx_id_for_update(
            &mut *db_tx,
            &cancel_provider_tx_id,
        )
        .await?
        {
            Some(mut existing) if existing.status == TransactionStatus::Failed => {
                existing.status = TransactionStatus::Syncing;
                TransactionRepo::update(&mut *db_tx, &existing).await?;
                existing
            }
            Some(_) => return Err(AppError::TransactionAlreadyExists),
            None => {
                TransactionRepo::create(
                    &mut *db_tx,
                    &NewTransaction {
                        user_id,
                        tx_type: TransactionType::Cancel,
                        status: TransactionStatus::Syncing,
                        amount: original_tx.amount,
                        currency: original_tx.currency.clone(),
                        provider_tx_id: cancel_provider_tx_id,
                        provider_withdrawn_tx_id: Some(original_tx.id),
                        old_balance: Decimal::ZERO,
                        new_balance: Decimal::ZERO,
                    },
                )
                .await?
            }
        };

        TransactionRepo::update_status(&mut *db_tx, original_tx.id, TransactionStatus::Cancelled)
            .await?;

        db_tx.commit().await?;

        info!(
            user_id,
            cancel_tx_id = cancel_tx.id,
            original_tx_id = original_tx.id,
            provider_tx_id = %provider_tx_id,
            "Cancel intent persisted"
        );

        // === Phase B: credit the user back via a wallet deposit ===
        let wallet_req = WalletTransactionRequest::single(
            user_id,
            &original_tx.currency,
            original_tx.amount,
            original_tx.id,
            &cancel_tx.provider_tx_id,
        );

        match self.wallet.deposit(wallet_req).await {
            Ok(resp) => {
                let balance = match parse_balance(&resp.balance) {
                    Ok(b) => b,
                    Err(parse_err) => {
                        return self
                            .rebound_cancel(&mut cancel_tx, &original_tx, parse_err)
                            .await;
                    }
                };

                self.complete_cancel(&mut cancel_tx, balance).await?;
                info!(cancel_tx_id = cancel_tx.id, new_balance = %balance, "Cancel completed");
                Ok(cancel_tx)
            }
            Err(wallet_err) if wallet_err.is_conflict() => {
                info!(
                    cancel_tx_id = cancel_tx.id,
                    "Cancel conflict: treating as already applied"
                );

                let balance = parse_balance(&self.wallet.get_balance(user_id).await?.balance)?;
                self.complete_cancel(&mut cancel_tx, balance).await?;
                Ok(cancel_tx)
            }
            Err(wallet_err) => {
                warn!(
                    cancel_tx_id = cancel_tx.id,
                    error = %wallet_err,
                    "Wallet failed cancel, rebounding withdraw to pending"
                );
                self.rebound_cancel(&mut cancel_tx, &original_tx, wallet_err.into())
                    .await
            }
        }
    }

    /// Complete the cancel row with observed balances
    async fn complete_cancel(
        &self,
        cancel_tx: &mut Transaction,
        balance: Decimal,
    ) -> Result<(), AppError> {
        cancel_tx.status = TransactionStatus::Completed;
        cancel_tx.new_balance = balance;
        cancel_tx.old_balance = balance - cancel_tx.amount;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, cancel_tx).await?;
        db_tx.commit().await?;

        Ok(())
    }

    /// Fail the cancel and rebound the withdraw `cancelled -> pending` so a
    /// later cancel attempt can succeed.
    async fn rebound_cancel(
        &self,
        cancel_tx: &mut Transaction,
        original_tx: &Transaction,
        err: AppError,
    ) -> Result<Transaction, AppError> {
        cancel_tx.status = TransactionStatus::Failed;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, cancel_tx).await?;
        TransactionRepo::update_status(&mut *db_tx, original_tx.id, TransactionStatus::Pending)
            .await?;
        db_tx.commit().await?;

        Err(err)
    }
}

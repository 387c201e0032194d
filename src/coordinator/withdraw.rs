//! Withdraw (bet placement)
//!
//! Phase A records the intent with the wallet's pre-balance; Phase B drives
//! the row to `pending` on success, `failed` + outbox compensation on server
//! errors, and runs the 409 balance-reconciliation protocol on conflicts.

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::TransactionCoordinator;
use super::common::{
    get_user_and_validate, parse_balance, validate_amount, validate_provider_tx_id,
};
use super::revert::RevertRequest;
use crate::error::AppError;
use crate::ledger::models::EVENT_TYPE_WITHDRAW_REVERT;
use crate::ledger::transactions::NewTransaction;
use crate::ledger::{
    EventStatus, OutboxEvent, OutboxRepo, Transaction, TransactionRepo, TransactionStatus,
    TransactionType,
};
use crate::wallet::WalletTransactionRequest;

/// Bet placement input
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub user_id: i64,
    pub amount: Decimal,
    pub provider_tx_id: String,
    pub currency: String,
}

impl TransactionCoordinator {
    pub(super) async fn withdraw_impl(
        &self,
        req: WithdrawRequest,
    ) -> Result<Transaction, AppError> {
        validate_amount(req.amount, false)?;
        validate_provider_tx_id(&req.provider_tx_id)?;

        let _guard = self.locks.lock(req.user_id, None).await?;

        // Pre-check balance; it only populates the intent row, the
        // wallet-success response overwrites both figures later.
        let pre_balance = parse_balance(&self.wallet.get_balance(req.user_id).await?.balance)?;

        // === Phase A: persist the intent ===
        let mut db_tx = self.pool.begin().await?;

        if TransactionRepo::get_by_provider_tx_id(&mut *db_tx, &req.provider_tx_id)
            .await?
            .is_some()
        {
            return Err(AppError::TransactionAlreadyExists);
        }

        get_user_and_validate(&mut *db_tx, req.user_id, &req.currency).await?;

        let mut transaction = TransactionRepo::create(
            &mut *db_tx,
            &NewTransaction {
                user_id: req.user_id,
                tx_type: TransactionType::Withdraw,
                status: TransactionStatus::Syncing,
                amount: req.amount,
                currency: req.currency.clone(),
                provider_tx_id: req.provider_tx_id.clone(),
                provider_withdrawn_tx_id: None,
                old_balance: pre_balance,
                new_balance: pre_balance - req.amount,
            },
        )
        .await?;

        // Commit quickly so no row locks are held across the wallet call
        db_tx.commit().await?;

        info!(
            user_id = req.user_id,
            transaction_id = transaction.id,
            provider_tx_id = %req.provider_tx_id,
            "Withdraw intent persisted"
        );

        // === Phase B: call the wallet and record the outcome ===
        let wallet_req = WalletTransactionRequest::single(
            req.user_id,
            &req.currency,
            req.amount,
            transaction.id,
            &req.provider_tx_id,
        );

        match self.wallet.withdraw(wallet_req).await {
            Ok(resp) => {
                let new_balance = match parse_balance(&resp.balance) {
                    Ok(b) => b,
                    Err(parse_err) => {
                        return self.fail_withdraw(&mut transaction, parse_err).await;
                    }
                };

                transaction.status = TransactionStatus::Pending;
                transaction.new_balance = new_balance;
                transaction.old_balance = new_balance + req.amount;

                let mut db_tx = self.pool.begin().await?;
                TransactionRepo::update(&mut *db_tx, &transaction).await?;
                db_tx.commit().await?;

                info!(
                    transaction_id = transaction.id,
                    new_balance = %new_balance,
                    "Withdraw synced with wallet"
                );
                Ok(transaction)
            }
            Err(wallet_err) if wallet_err.is_conflict() => {
                self.reconcile_withdraw_conflict(transaction, &req, pre_balance)
                    .await
            }
            Err(wallet_err) if wallet_err.is_client_error() => {
                warn!(
                    transaction_id = transaction.id,
                    error = %wallet_err,
                    "Wallet rejected withdraw"
                );
                self.fail_withdraw(&mut transaction, wallet_err.into())
                    .await
            }
            Err(wallet_err) => {
                // Server error: the wallet may or may not have applied the
                // withdraw. Record the failure and enqueue guaranteed
                // compensation in the same transaction.
                error!(
                    transaction_id = transaction.id,
                    error = %wallet_err,
                    "Wallet server error on withdraw, enqueueing compensation"
                );

                transaction.status = TransactionStatus::Failed;

                let event = OutboxEvent {
                    id: Uuid::new_v4().to_string(),
                    event_type: EVENT_TYPE_WITHDRAW_REVERT.to_string(),
                    data: json!({
                        "user_id": req.user_id,
                        "amount": req.amount,
                        "provider_tx_id": req.provider_tx_id,
                    }),
                    status: EventStatus::Pending,
                    retry_count: 0,
                    created_at: Utc::now(),
                    processed_at: None,
                    error: None,
                };

                let mut db_tx = self.pool.begin().await?;
                TransactionRepo::update(&mut *db_tx, &transaction).await?;
                OutboxRepo::save(&mut *db_tx, &event).await?;
                db_tx.commit().await?;

                Err(wallet_err.into())
            }
        }
    }

    /// 409 reconciliation: the remote is authoritative, confirm via balance.
    ///
    /// If the post-balance equals `pre - amount` the wallet did apply the
    /// withdraw and the row becomes `pending`. Diverged balances mean a
    /// concurrent actor interfered: fail the row, revert on the remote side
    /// and report the conflict.
    async fn reconcile_withdraw_conflict(
        &self,
        mut transaction: Transaction,
        req: &WithdrawRequest,
        pre_balance: Decimal,
    ) -> Result<Transaction, AppError> {
        let post_balance = parse_balance(&self.wallet.get_balance(req.user_id).await?.balance)?;

        if post_balance == pre_balance - req.amount {
            info!(
                transaction_id = transaction.id,
                post_balance = %post_balance,
                "Withdraw conflict reconciled: wallet already applied"
            );

            transaction.status = TransactionStatus::Pending;
            transaction.new_balance = post_balance;
            transaction.old_balance = post_balance + req.amount;

            let mut db_tx = self.pool.begin().await?;
            TransactionRepo::update(&mut *db_tx, &transaction).await?;
            db_tx.commit().await?;

            return Ok(transaction);
        }

        warn!(
            transaction_id = transaction.id,
            pre_balance = %pre_balance,
            post_balance = %post_balance,
            "Withdraw conflict diverged, reverting remote side"
        );

        transaction.status = TransactionStatus::Failed;
        transaction.old_balance = pre_balance;
        transaction.new_balance = post_balance;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, &transaction).await?;
        db_tx.commit().await?;

        // The user lock is already held by this operation
        self.revert_locked(RevertRequest {
            user_id: req.user_id,
            provider_tx_id: req.provider_tx_id.clone(),
            amount: req.amount,
            origin_type: TransactionType::Withdraw,
        })
        .await?;

        Err(AppError::ConcurrentModification)
    }

    /// Mark the withdraw failed and surface the given error
    async fn fail_withdraw(
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

//! Revert (compensating reversal)
//!
//! Issued when a withdraw appears to have taken effect remotely while the
//! local record is `failed`, either synchronously from the withdraw conflict
//! path or asynchronously when the outbox drains a `WITHDRAW_REVERT` event.
//!
//! Idempotency: at most one revert row exists per origin. An origin that is
//! not `failed` is returned unchanged without creating anything; a
//! concurrent actor already advanced it and erroring would only poison
//! outbox retries.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::TransactionCoordinator;
use super::common::{get_user, parse_balance, validate_ownership};
use crate::error::AppError;
use crate::ledger::transactions::NewTransaction;
use crate::ledger::{Transaction, TransactionRepo, TransactionStatus, TransactionType};
use crate::wallet::WalletTransactionRequest;

/// Compensation input
#[derive(Debug, Clone)]
pub struct RevertRequest {
    pub user_id: i64,
    /// Provider transaction id of the origin being compensated
    pub provider_tx_id: String,
    pub amount: Decimal,
    /// What the origin was; decides the direction of the compensating call
    pub origin_type: TransactionType,
}

impl TransactionCoordinator {
    pub(super) async fn revert_impl(&self, req: RevertRequest) -> Result<Transaction, AppError> {
        let revert_provider_tx_id = format!("revert_{}", req.provider_tx_id);

        // === Phase A: idempotency gate + intent ===
        let mut db_tx = self.pool.begin().await?;

        get_user(&mut *db_tx, req.user_id).await?;

        if let Some(existing) =
            TransactionRepo::get_by_provider_tx_id(&mut *db_tx, &revert_provider_tx_id).await?
        {
            info!(
                revert_tx_id = existing.id,
                provider_tx_id = %req.provider_tx_id,
                "Revert already exists, returning it unchanged"
            );
            return Ok(existing);
        }

        let origin_tx =
            TransactionRepo::get_by_provider_tx_id_for_update(&mut *db_tx, &req.provider_tx_id)
                .await?
                .ok_or(AppError::TransactionNotFound)?;

        validate_ownership(&origin_tx, req.user_id)?;

        if origin_tx.status != TransactionStatus::Failed {
            warn!(
                origin_tx_id = origin_tx.id,
                status = %origin_tx.status,
                "Origin is not failed, nothing to revert"
            );
            return Ok(origin_tx);
        }

        let mut revert_tx = TransactionRepo::create(
            &mut *db_tx,
            &NewTransaction {
                user_id: req.user_id,
                tx_type: TransactionType::Revert,
                status: TransactionStatus::Syncing,
                amount: req.amount,
                currency: origin_tx.currency.clone(),
                provider_tx_id: revert_provider_tx_id,
                provider_withdrawn_tx_id: Some(origin_tx.id),
                old_balance: Decimal::ZERO,
                new_balance: Decimal::ZERO,
            },
        )
        .await?;

        db_tx.commit().await?;

        info!(
            user_id = req.user_id,
            revert_tx_id = revert_tx.id,
            origin_tx_id = origin_tx.id,
            origin_type = %req.origin_type,
            "Revert intent persisted"
        );

        // === Phase B: compensate in the opposite direction of the origin ===
        let wallet_req = WalletTransactionRequest::single(
            req.user_id,
            &origin_tx.currency,
            req.amount,
            revert_tx.id,
            &revert_tx.provider_tx_id,
        );

        let result = match req.origin_type {
            TransactionType::Withdraw => self.wallet.deposit(wallet_req).await,
            TransactionType::Deposit => self.wallet.withdraw(wallet_req).await,
            other => {
                return Err(AppError::InvalidFormat(format!(
                    "cannot revert a {other} transaction"
                )));
            }
        };

        match result {
            Ok(resp) => {
                let balance = match parse_balance(&resp.balance) {
                    Ok(b) => b,
                    Err(parse_err) => {
                        return self.fail_revert(&mut revert_tx, parse_err).await;
                    }
                };

                self.complete_revert(&mut revert_tx, req.origin_type, balance)
                    .await?;
                info!(revert_tx_id = revert_tx.id, new_balance = %balance, "Revert completed");
                Ok(revert_tx)
            }
            Err(wallet_err) if wallet_err.is_conflict() => {
                info!(
                    revert_tx_id = revert_tx.id,
                    "Revert conflict: treating as already applied"
                );

                let balance =
                    parse_balance(&self.wallet.get_balance(req.user_id).await?.balance)?;
                self.complete_revert(&mut revert_tx, req.origin_type, balance)
                    .await?;
                Ok(revert_tx)
            }
            Err(wallet_err) => {
                warn!(
                    revert_tx_id = revert_tx.id,
                    error = %wallet_err,
                    "Wallet failed revert"
                );
                self.fail_revert(&mut revert_tx, wallet_err.into()).await
            }
        }
    }

    /// Complete the revert with observed balances.
    ///
    /// A withdraw origin was compensated by a deposit (balance went up);
    /// a deposit origin by a withdraw (balance went down).
    async fn complete_revert(
        &self,
        revert_tx: &mut Transaction,
        origin_type: TransactionType,
        balance: Decimal,
    ) -> Result<(), AppError> {
        revert_tx.status = TransactionStatus::Completed;
        revert_tx.new_balance = balance;
        revert_tx.old_balance = match origin_type {
            TransactionType::Deposit => balance + revert_tx.amount,
            _ => balance - revert_tx.amount,
        };

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, revert_tx).await?;
        db_tx.commit().await?;

        Ok(())
    }

    /// Mark the revert failed and surface the given error
    async fn fail_revert(
        &self,
        revert_tx: &mut Transaction,
        err: AppError,
    ) -> Result<Transaction, AppError> {
        revert_tx.status = TransactionStatus::Failed;

        let mut db_tx = self.pool.begin().await?;
        TransactionRepo::update(&mut *db_tx, revert_tx).await?;
        db_tx.commit().await?;

        Err(err)
    }
}

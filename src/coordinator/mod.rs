//! Transaction Coordinator
//!
//! Saga-style orchestration of the four ledger operations against the
//! remote wallet.
//!
//! # Two-phase pattern
//!
//! Every operation validates its inputs, takes the per-user lock and then:
//!
//! - **Phase A** persists a `syncing` intent row in one local database
//!   transaction and commits it.
//! - **Phase B** calls the wallet, then opens a *second* local transaction
//!   that advances or regresses the intent based on the classified outcome.
//!
//! Row locks are therefore never held across the wallet RPC (which may take
//! seconds under retry), yet every externally visible state change is
//! durably recorded either before or after the call. Error paths roll the
//! open transaction back by dropping it before returning.
//!
//! # State machine
//!
//! ```text
//!                  create
//!   (none) ───────────────────► syncing
//!               wallet ok(settle)       wallet ok(place)
//!   syncing ──────────────────► completed      or ──────► pending
//!   syncing ──── wallet 4xx/5xx/parse ────► failed
//!   pending ──── cancel ok                ────► cancelled
//!   pending ──── deposit ok               ────► completed
//!   cancelled ── cancel wallet 4xx/5xx    ────► pending   (rebound)
//!   failed   ── revert triggered          (new revert row, no transition)
//! ```
//!
//! Tie-breaks: a wallet 409 always means "remote is authoritative" and is
//! reconciled with a balance read; balance parse failures count as client
//! errors for the local bookkeeping.

mod cancel;
mod common;
mod deposit;
mod revert;
mod withdraw;

#[cfg(test)]
mod integration_tests;

pub use common::parse_balance;
pub use deposit::DepositRequest;
pub use revert::RevertRequest;
pub use withdraw::WithdrawRequest;

use std::sync::Arc;

use sqlx::PgPool;

use crate::error::AppError;
use crate::ledger::Transaction;
use crate::lock::UserLockManager;
use crate::wallet::WalletApi;

/// Orchestrates withdraw / deposit / cancel / revert sagas
pub struct TransactionCoordinator {
    pool: PgPool,
    wallet: Arc<dyn WalletApi>,
    locks: Arc<UserLockManager>,
}

impl TransactionCoordinator {
    pub fn new(pool: PgPool, wallet: Arc<dyn WalletApi>, locks: Arc<UserLockManager>) -> Self {
        Self {
            pool,
            wallet,
            locks,
        }
    }

    /// Place a bet: reserve funds on the wallet side
    pub async fn withdraw(&self, req: WithdrawRequest) -> Result<Transaction, AppError> {
        self.withdraw_impl(req).await
    }

    /// Settle a bet: pay out (or zero-settle) a pending placement
    pub async fn deposit(&self, req: DepositRequest) -> Result<Transaction, AppError> {
        self.deposit_impl(req).await
    }

    /// Cancel a still-pending placement, crediting the user back
    pub async fn cancel(&self, user_id: i64, provider_tx_id: &str) -> Result<Transaction, AppError> {
        self.cancel_impl(user_id, provider_tx_id).await
    }

    /// Compensate a failed origin transaction.
    ///
    /// Takes the per-user lock; this is the entry point for the outbox
    /// processor and other external callers. Idempotent: at most one revert
    /// row exists per origin, and a non-`failed` origin is returned
    /// unchanged without creating anything.
    pub async fn revert(&self, req: RevertRequest) -> Result<Transaction, AppError> {
        let _guard = self.locks.lock(req.user_id, None).await?;
        self.revert_impl(req).await
    }

    /// Compensate while the caller already holds the user lock.
    ///
    /// Used by the withdraw conflict path, which detects divergence inside
    /// its own locked section.
    pub(crate) async fn revert_locked(&self, req: RevertRequest) -> Result<Transaction, AppError> {
        self.revert_impl(req).await
    }
}

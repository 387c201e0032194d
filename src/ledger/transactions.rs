//! Transaction repository

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

use super::models::{Transaction, TransactionStatus, TransactionType};
use crate::error::AppError;

/// Fields for inserting a new transaction row
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub currency: String,
    pub provider_tx_id: String,
    pub provider_withdrawn_tx_id: Option<i64>,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
}

const TX_COLUMNS: &str = "id, user_id, tx_type, status, amount, currency, provider_tx_id, \
                          provider_withdrawn_tx_id, old_balance, new_balance, created_at, updated_at";

/// Transaction repository
///
/// All methods take an executor so callers decide whether they run against
/// the pool or inside an open transaction. The `..._for_update` variants
/// must run inside a transaction.
pub struct TransactionRepo;

impl TransactionRepo {
    /// Insert a new transaction and return the stored row
    pub async fn create(
        executor: impl PgExecutor<'_>,
        new: &NewTransaction,
    ) -> Result<Transaction, AppError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions
                (user_id, tx_type, status, amount, currency, provider_tx_id,
                 provider_withdrawn_tx_id, old_balance, new_balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(new.tx_type.as_str())
        .bind(new.status.as_str())
        .bind(new.amount)
        .bind(&new.currency)
        .bind(&new.provider_tx_id)
        .bind(new.provider_withdrawn_tx_id)
        .bind(new.old_balance)
        .bind(new.new_balance)
        .fetch_one(executor)
        .await?;

        row_to_transaction(&row)
    }

    /// Get a transaction by primary key
    pub async fn get_by_id(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Get a transaction by primary key with a row-level exclusive lock
    pub async fn get_by_id_for_update(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Get a transaction by provider transaction id
    pub async fn get_by_provider_tx_id(
        executor: impl PgExecutor<'_>,
        provider_tx_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE provider_tx_id = $1"
        ))
        .bind(provider_tx_id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Get a transaction by provider transaction id with a row-level lock
    pub async fn get_by_provider_tx_id_for_update(
        executor: impl PgExecutor<'_>,
        provider_tx_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE provider_tx_id = $1 FOR UPDATE"
        ))
        .bind(provider_tx_id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Get the child transaction referencing a withdraw
    pub async fn get_by_provider_withdrawn_tx_id(
        executor: impl PgExecutor<'_>,
        provider_withdrawn_tx_id: i64,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE provider_withdrawn_tx_id = $1 LIMIT 1"
        ))
        .bind(provider_withdrawn_tx_id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// List a user's transactions, newest first
    pub async fn list_by_user(
        executor: impl PgExecutor<'_>,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TX_COLUMNS} FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// Persist status and observed balances for a transaction
    pub async fn update(
        executor: impl PgExecutor<'_>,
        tx: &Transaction,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, old_balance = $2, new_balance = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(tx.status.as_str())
        .bind(tx.old_balance)
        .bind(tx.new_balance)
        .bind(tx.id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Update only the status of a transaction
    pub async fn update_status(
        executor: impl PgExecutor<'_>,
        id: i64,
        status: TransactionStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE transactions SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }
}

/// Convert a database row into a Transaction
fn row_to_transaction(row: &PgRow) -> Result<Transaction, AppError> {
    let type_str: String = row.get("tx_type");
    let tx_type = TransactionType::from_str(&type_str)
        .ok_or_else(|| AppError::DatabaseQuery(format!("invalid tx_type: {}", type_str)))?;

    let status_str: String = row.get("status");
    let status = TransactionStatus::from_str(&status_str)
        .ok_or_else(|| AppError::DatabaseQuery(format!("invalid status: {}", status_str)))?;

    Ok(Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tx_type,
        status,
        amount: row.get("amount"),
        currency: row.get("currency"),
        provider_tx_id: row.get("provider_tx_id"),
        provider_withdrawn_tx_id: row.get("provider_withdrawn_tx_id"),
        old_balance: row.get("old_balance"),
        new_balance: row.get("new_balance"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

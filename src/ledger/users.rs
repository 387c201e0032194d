//! User repository

use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

use super::models::User;
use crate::error::AppError;

pub struct UserRepo;

impl UserRepo {
    /// Get a user by id
    pub async fn get(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password, currency, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    /// Get a user by id with a row-level exclusive lock
    pub async fn get_for_update(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password, currency, created_at, updated_at \
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    /// Get a user by username
    pub async fn get_by_username(
        executor: impl PgExecutor<'_>,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password, currency, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    /// Insert a user with an explicit (wallet-assigned) id
    pub async fn create(executor: impl PgExecutor<'_>, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.currency)
        .execute(executor)
        .await?;

        Ok(())
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password: row.get("password"),
        currency: row.get("currency"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

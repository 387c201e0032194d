//! Application Error Types
//!
//! Single error taxonomy for the broker. Every variant carries enough to
//! render the API error body: a stable code, a display message and an HTTP
//! status suggestion.

use thiserror::Error;

use crate::wallet::WalletError;

/// Broker error taxonomy
///
/// Error codes are stable identifiers clients branch on; messages are safe
/// to display to end users.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // === Auth Errors ===
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authorization token missing")]
    TokenMissing,

    #[error("Authorization token invalid or expired")]
    TokenInvalid,

    #[error("Operation not permitted")]
    Forbidden,

    // === User Errors ===
    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("User currency does not match")]
    InvalidCurrency,

    // === Transaction Errors ===
    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Transaction already exists")]
    TransactionAlreadyExists,

    #[error("Transaction cannot be {0}")]
    TransactionInvalidStatus(String),

    #[error("Withdrawal already settled")]
    TransactionAlreadyDeposited,

    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount cannot have more than 2 decimal places")]
    InvalidPrecision,

    #[error("{0} is required")]
    RequiredField(&'static str),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    // === Infrastructure Errors ===
    #[error("Timed out while serializing user operations")]
    LockTimeout,

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("Database query failed: {0}")]
    DatabaseQuery(String),

    // === Wallet Errors ===
    #[error("Wallet service error: {message}")]
    WalletService { message: String, status: u16 },

    #[error("Concurrent modification detected; asynchronous compensation is in progress")]
    ConcurrentModification,
}

impl AppError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::Forbidden => "FORBIDDEN",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            AppError::InvalidCurrency => "INVALID_CURRENCY",
            AppError::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            AppError::TransactionAlreadyExists => "TRANSACTION_ALREADY_EXISTS",
            AppError::TransactionInvalidStatus(_) => "TRANSACTION_INVALID_STATUS",
            AppError::TransactionAlreadyDeposited => "TRANSACTION_ALREADY_DEPOSITED",
            AppError::InvalidAmount => "INVALID_AMOUNT",
            AppError::InvalidPrecision => "INVALID_PRECISION",
            AppError::RequiredField(_) => "REQUIRED_FIELD",
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::LockTimeout => "TIMEOUT",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::WalletService { .. } => "WALLET_SERVICE_ERROR",
            AppError::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }

    /// HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidCredentials | AppError::TokenMissing | AppError::TokenInvalid => 401,
            AppError::Forbidden => 403,
            AppError::UserNotFound | AppError::TransactionNotFound => 404,
            AppError::InsufficientBalance
            | AppError::InvalidCurrency
            | AppError::TransactionInvalidStatus(_)
            | AppError::TransactionAlreadyDeposited
            | AppError::InvalidAmount
            | AppError::InvalidPrecision
            | AppError::RequiredField(_)
            | AppError::InvalidFormat(_) => 400,
            AppError::TransactionAlreadyExists => 409,
            AppError::ConcurrentModification => 409,
            AppError::LockTimeout => 408,
            AppError::DatabaseConnection(_) | AppError::DatabaseQuery(_) => 500,
            AppError::WalletService { status, .. } => match *status {
                s @ 400..=599 => s,
                _ => 500,
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::DatabaseConnection(e.to_string())
            }
            other => AppError::DatabaseQuery(other.to_string()),
        }
    }
}

impl From<WalletError> for AppError {
    fn from(e: WalletError) -> Self {
        if e.is_conflict() {
            return AppError::ConcurrentModification;
        }
        // Wallet 4xx surfaces as 400, 5xx and transport failures as 500
        let status = if e.is_client_error() { 400 } else { 500 };
        AppError::WalletService {
            message: e.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidAmount.code(), "INVALID_AMOUNT");
        assert_eq!(
            AppError::TransactionAlreadyExists.code(),
            "TRANSACTION_ALREADY_EXISTS"
        );
        assert_eq!(AppError::LockTimeout.code(), "TIMEOUT");
        assert_eq!(
            AppError::ConcurrentModification.code(),
            "CONCURRENT_MODIFICATION"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AppError::InvalidCredentials.http_status(), 401);
        assert_eq!(AppError::Forbidden.http_status(), 403);
        assert_eq!(AppError::UserNotFound.http_status(), 404);
        assert_eq!(AppError::InvalidPrecision.http_status(), 400);
        assert_eq!(AppError::TransactionAlreadyExists.http_status(), 409);
        assert_eq!(AppError::LockTimeout.http_status(), 408);
        assert_eq!(AppError::DatabaseQuery("x".into()).http_status(), 500);
    }

    #[test]
    fn test_wallet_error_status_passthrough() {
        let err = AppError::WalletService {
            message: "declined".into(),
            status: 400,
        };
        assert_eq!(err.http_status(), 400);

        let err = AppError::WalletService {
            message: "boom".into(),
            status: 503,
        };
        assert_eq!(err.http_status(), 503);

        // Out-of-range statuses fall back to 500
        let err = AppError::WalletService {
            message: "weird".into(),
            status: 200,
        };
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_display_messages_are_user_safe() {
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(
            AppError::TransactionInvalidStatus("cancelled".into()).to_string(),
            "Transaction cannot be cancelled"
        );
    }
}

//! Wallet Service Error
//!
//! Every non-success outcome of a wallet call collapses into one error kind
//! carrying the HTTP status; the coordinator classifies purely on that
//! status (409 = conflict, 4xx = client, 5xx/transport = server).

use thiserror::Error;

/// Pseudo-status used when the request never produced an HTTP response
pub const STATUS_TRANSPORT: u16 = 0;

#[derive(Error, Debug, Clone)]
#[error("wallet service error: {code} - {message}")]
pub struct WalletError {
    pub http_status: u16,
    pub code: String,
    pub message: String,
}

impl WalletError {
    pub fn new(http_status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            http_status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Transport-level failure (connect, timeout, body read)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(STATUS_TRANSPORT, "TRANSPORT", message)
    }

    /// Idempotent retry collision or already-applied operation
    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.http_status == 409
    }

    /// Validation failure, insufficient funds, unknown user, ...
    ///
    /// 409 is carved out: conflicts get their own reconciliation path.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status) && !self.is_conflict()
    }

    /// Remote failure or transport failure; the operation may or may not
    /// have been applied.
    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.http_status >= 500 || self.http_status == STATUS_TRANSPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let err = WalletError::new(409, "CONFLICT", "duplicate reference");
        assert!(err.is_conflict());
        assert!(!err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_client_error_classification() {
        let err = WalletError::new(400, "INSUFFICIENT_FUNDS", "not enough balance");
        assert!(err.is_client_error());
        assert!(!err.is_conflict());
        assert!(!err.is_server_error());

        let err = WalletError::new(404, "USER_NOT_FOUND", "unknown user");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_server_error_classification() {
        let err = WalletError::new(500, "INTERNAL", "boom");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());

        let err = WalletError::transport("connection refused");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_display() {
        let err = WalletError::new(400, "BAD_AMOUNT", "amount must be positive");
        assert_eq!(
            err.to_string(),
            "wallet service error: BAD_AMOUNT - amount must be positive"
        );
    }
}

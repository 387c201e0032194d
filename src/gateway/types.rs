//! API types: request/response DTOs, the error body and handler error type
//!
//! Error responses always carry a code the client can branch on and a
//! message safe to display, plus ambient request metadata when available:
//!
//! ```json
//! {"error": {"code", "message", "timestamp", "request_id?", "user_id?",
//!            "path?", "method?"}, "success": false}
//! ```

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::AppError;

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable error code clients branch on
    #[schema(example = "INVALID_AMOUNT")]
    pub code: String,
    /// Human-readable, safe to display
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    /// Always false
    pub success: bool,
}

// ============================================================================
// Request metadata
// ============================================================================

/// Ambient request metadata attached to error responses
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub path: String,
    pub method: String,
    pub user_id: Option<String>,
}

impl RequestMeta {
    /// Attach this request's metadata to an error
    pub fn wrap(&self, err: AppError) -> ApiError {
        ApiError {
            err,
            meta: Some(self.clone()),
        }
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let user_id = parts
            .extensions
            .get::<Claims>()
            .map(|claims| claims.sub.clone());

        Ok(Self {
            request_id,
            path: parts.uri.path().to_string(),
            method: parts.method.to_string(),
            user_id,
        })
    }
}

// ============================================================================
// Handler error type
// ============================================================================

/// Handler error: an [`AppError`] plus optional request metadata
#[derive(Debug)]
pub struct ApiError {
    pub err: AppError,
    pub meta: Option<RequestMeta>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self { err, meta: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (request_id, user_id, path, method) = match self.meta {
            Some(meta) => (
                Some(meta.request_id),
                meta.user_id,
                Some(meta.path),
                Some(meta.method),
            ),
            None => (None, None, None, None),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.err.code().to_string(),
                message: self.err.to_string(),
                timestamp: Utc::now(),
                request_id,
                user_id,
                path,
                method,
            },
            success: false,
        };

        (status, Json(body)).into_response()
    }
}

/// Shorthand for handler return types
pub type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

// ============================================================================
// Request / response DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user1")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// User view with the wallet-authoritative balance
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    #[schema(value_type = f64, example = 100.00)]
    pub balance: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawBody {
    #[schema(value_type = f64, example = 10.00)]
    pub amount: Decimal,
    #[schema(example = "tx1")]
    pub provider_tx_id: String,
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositBody {
    #[schema(value_type = f64, example = 20.00)]
    pub amount: Decimal,
    #[schema(example = "tx1s")]
    pub provider_tx_id: String,
    pub provider_withdrawn_tx_id: i64,
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Page size (default 50, max 200)
    pub limit: Option<i64>,
    /// Page offset (default 0)
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Validate a currency code: exactly 3 uppercase ASCII letters
pub fn validate_currency(currency: &str) -> Result<(), AppError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Ok(());
    }
    Err(AppError::InvalidFormat(
        "currency must be exactly 3 uppercase letters".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("KES").is_ok());

        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("USDT").is_err());
        assert!(validate_currency("U5D").is_err());
        assert!(validate_currency("").is_err());
    }

    #[test]
    fn test_error_body_shape() {
        let api_err = ApiError {
            err: AppError::InvalidAmount,
            meta: Some(RequestMeta {
                request_id: "req-1".to_string(),
                path: "/api/v1/transactions/withdraw".to_string(),
                method: "POST".to_string(),
                user_id: Some("42".to_string()),
            }),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: api_err.err.code().to_string(),
                message: api_err.err.to_string(),
                timestamp: Utc::now(),
                request_id: api_err.meta.as_ref().map(|m| m.request_id.clone()),
                user_id: api_err.meta.as_ref().and_then(|m| m.user_id.clone()),
                path: api_err.meta.as_ref().map(|m| m.path.clone()),
                method: api_err.meta.as_ref().map(|m| m.method.clone()),
            },
            success: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "INVALID_AMOUNT");
        assert_eq!(json["error"]["request_id"], "req-1");
        assert_eq!(json["error"]["path"], "/api/v1/transactions/withdraw");
    }

    #[test]
    fn test_error_body_omits_absent_metadata() {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: "TIMEOUT".to_string(),
                message: "timed out".to_string(),
                timestamp: Utc::now(),
                request_id: None,
                user_id: None,
                path: None,
                method: None,
            },
            success: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json["error"].get("request_id").is_none());
        assert!(json["error"].get("path").is_none());
    }
}

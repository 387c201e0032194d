use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::auth::Claims;
use crate::coordinator::{DepositRequest, WithdrawRequest};
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ApiResult, DepositBody, ListQuery, RequestMeta, WithdrawBody, validate_currency,
};
use crate::ledger::{Transaction, TransactionRepo};

/// Place a bet (withdraw)
///
/// POST /api/v1/transactions/withdraw
#[utoipa::path(
    post,
    path = "/api/v1/transactions/withdraw",
    request_body = WithdrawBody,
    responses(
        (status = 200, description = "Placement recorded", body = Transaction),
        (status = 400, description = "Validation or wallet client error", body = crate::gateway::types::ErrorResponse),
        (status = 409, description = "Duplicate id or concurrent modification", body = crate::gateway::types::ErrorResponse),
        (status = 500, description = "Wallet or database failure", body = crate::gateway::types::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    meta: RequestMeta,
    Json(body): Json<WithdrawBody>,
) -> ApiResult<Transaction> {
    let user_id = claims.user_id().map_err(|e| meta.wrap(e))?;
    validate_currency(&body.currency).map_err(|e| meta.wrap(e))?;

    let tx = state
        .coordinator
        .withdraw(WithdrawRequest {
            user_id,
            amount: body.amount,
            provider_tx_id: body.provider_tx_id,
            currency: body.currency,
        })
        .await
        .map_err(|e| meta.wrap(e))?;

    Ok((StatusCode::OK, Json(tx)))
}

/// Settle a bet (deposit)
///
/// POST /api/v1/transactions/deposit
#[utoipa::path(
    post,
    path = "/api/v1/transactions/deposit",
    request_body = DepositBody,
    responses(
        (status = 200, description = "Settlement recorded", body = Transaction),
        (status = 400, description = "Validation or wallet client error", body = crate::gateway::types::ErrorResponse),
        (status = 404, description = "Originating withdraw not found", body = crate::gateway::types::ErrorResponse),
        (status = 409, description = "Duplicate provider transaction id", body = crate::gateway::types::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    meta: RequestMeta,
    Json(body): Json<DepositBody>,
) -> ApiResult<Transaction> {
    let user_id = claims.user_id().map_err(|e| meta.wrap(e))?;
    validate_currency(&body.currency).map_err(|e| meta.wrap(e))?;

    let tx = state
        .coordinator
        .deposit(DepositRequest {
            user_id,
            amount: body.amount,
            provider_tx_id: body.provider_tx_id,
            provider_withdrawn_tx_id: body.provider_withdrawn_tx_id,
            currency: body.currency,
        })
        .await
        .map_err(|e| meta.wrap(e))?;

    Ok((StatusCode::OK, Json(tx)))
}

/// Cancel a pending bet
///
/// POST /api/v1/transactions/cancel/{provider_tx_id}
#[utoipa::path(
    post,
    path = "/api/v1/transactions/cancel/{provider_tx_id}",
    params(
        ("provider_tx_id" = String, Path, description = "Provider transaction id of the withdraw to cancel")
    ),
    responses(
        (status = 200, description = "Cancel recorded", body = Transaction),
        (status = 400, description = "Withdraw not cancellable", body = crate::gateway::types::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::gateway::types::ErrorResponse),
        (status = 500, description = "Wallet failure; withdraw rebounds to pending", body = crate::gateway::types::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    meta: RequestMeta,
    Path(provider_tx_id): Path<String>,
) -> ApiResult<Transaction> {
    let user_id = claims.user_id().map_err(|e| meta.wrap(e))?;

    let tx = state
        .coordinator
        .cancel(user_id, &provider_tx_id)
        .await
        .map_err(|e| meta.wrap(e))?;

    Ok((StatusCode::OK, Json(tx)))
}

/// List the current user's transactions, newest first
///
/// GET /api/v1/transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(ListQuery),
    responses(
        (status = 200, description = "Transaction history", body = Vec<Transaction>),
        (status = 401, description = "Unauthorized", body = crate::gateway::types::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    meta: RequestMeta,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Transaction>> {
    let user_id = claims.user_id().map_err(|e| meta.wrap(e))?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let txs = TransactionRepo::list_by_user(&state.pool, user_id, limit, offset)
        .await
        .map_err(|e| meta.wrap(e))?;

    Ok((StatusCode::OK, Json(txs)))
}

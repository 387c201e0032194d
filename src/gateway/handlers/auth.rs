use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::coordinator::parse_balance;
use crate::error::AppError;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResult, LoginRequest, LoginResponse, RequestMeta, UserView};

/// Login with username/password
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::gateway::types::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    if req.username.is_empty() {
        return Err(meta.wrap(AppError::RequiredField("username")));
    }
    if req.password.is_empty() {
        return Err(meta.wrap(AppError::RequiredField("password")));
    }

    let (token, user) = state
        .auth
        .login(&req.username, &req.password)
        .await
        .map_err(|e| meta.wrap(e))?;

    // Balance authority is the wallet, fetched fresh on every login
    let balance_resp = state
        .wallet
        .get_balance(user.id)
        .await
        .map_err(|e| meta.wrap(e.into()))?;
    let balance = parse_balance(&balance_resp.balance).map_err(|e| meta.wrap(e))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token,
            user: UserView {
                id: user.id,
                username: user.username,
                balance,
                currency: user.currency,
            },
        }),
    ))
}

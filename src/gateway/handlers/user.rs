use axum::{Extension, Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::auth::Claims;
use crate::coordinator::parse_balance;
use crate::error::AppError;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResult, RequestMeta, UserView};
use crate::ledger::UserRepo;

/// Current user with wallet balance
///
/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserView),
        (status = 401, description = "Unauthorized", body = crate::gateway::types::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    meta: RequestMeta,
) -> ApiResult<UserView> {
    let user_id = claims.user_id().map_err(|e| meta.wrap(e))?;

    let user = UserRepo::get(&state.pool, user_id)
        .await
        .map_err(|e| meta.wrap(e))?
        .ok_or_else(|| meta.wrap(AppError::UserNotFound))?;

    let balance_resp = state
        .wallet
        .get_balance(user.id)
        .await
        .map_err(|e| meta.wrap(e.into()))?;
    let balance = parse_balance(&balance_resp.balance).map_err(|e| meta.wrap(e))?;

    Ok((
        StatusCode::OK,
        Json(UserView {
            id: user.id,
            username: user.username,
            balance,
            currency: user.currency,
        }),
    ))
}

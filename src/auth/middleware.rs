use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiError;

/// Bearer-token guard for the transaction routes.
///
/// Verifies the JWT and injects the claims into request extensions for the
/// handlers to consume.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::from(AppError::TokenMissing))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::from(AppError::TokenInvalid))?;

    let claims = state.auth.verify_token(token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
